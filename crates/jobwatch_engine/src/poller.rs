use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jobwatch_core::{ErrorClass, PageRequest, ResourceKey};
use jobwatch_logging::{watch_debug, watch_info, watch_warn};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::QueryCache;
use crate::EngineEvent;

/// The refresh cadence shared by every poller. Changing it is observed by
/// all pollers at once. `Duration::ZERO` means manual refresh only.
#[derive(Debug, Clone)]
pub struct PollCadence {
    tx: Arc<watch::Sender<Duration>>,
}

impl PollCadence {
    pub fn new(interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(interval);
        Self { tx: Arc::new(tx) }
    }

    pub fn manual() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn set_interval(&self, interval: Duration) {
        let previous = self.tx.send_replace(interval);
        if previous != interval {
            watch_info!("Poll interval changed from {:?} to {:?}", previous, interval);
        }
    }

    pub fn interval(&self) -> Duration {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.tx.subscribe()
    }
}

impl Default for PollCadence {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Upper bound for the delay after repeated transport failures.
    pub max_backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Delay before the next tick, or `None` when no timer should be armed.
pub fn next_delay(interval: Duration, failures: u32, max_backoff: Duration) -> Option<Duration> {
    if interval.is_zero() {
        return None;
    }
    if failures == 0 {
        return Some(interval);
    }
    let factor = 2u32.saturating_pow(failures.min(16));
    Some(interval.saturating_mul(factor).min(max_backoff.max(interval)))
}

/// Controls one running poller. Dropping the handle stops the poller.
#[derive(Debug)]
pub struct PollerHandle {
    resource_key: ResourceKey,
    target: watch::Sender<PageRequest>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Spawns a poller on the current tokio runtime. It fetches `request`
    /// immediately, then on every tick of `cadence`.
    pub fn spawn<T>(
        cache: QueryCache<T>,
        request: PageRequest,
        cadence: &PollCadence,
        settings: PollSettings,
        events: mpsc::UnboundedSender<EngineEvent<T>>,
    ) -> Self
    where
        T: Send + Sync + 'static,
    {
        let resource_key = request.resource_key.clone();
        let (target, target_rx) = watch::channel(request);
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let poller = Poller {
            cache,
            target: target_rx,
            cadence: cadence.subscribe(),
            refresh: Arc::clone(&refresh),
            cancel: cancel.clone(),
            settings,
            events,
        };
        let task = tokio::spawn(poller.run());
        watch_debug!("Poller for {} started", resource_key);

        Self {
            resource_key,
            target,
            refresh,
            cancel,
            task,
        }
    }

    pub fn resource_key(&self) -> &ResourceKey {
        &self.resource_key
    }

    pub fn current_target(&self) -> PageRequest {
        self.target.borrow().clone()
    }

    /// Points the poller at a new request and fetches it right away.
    pub fn retarget(&self, request: PageRequest) {
        self.target.send_replace(request);
    }

    /// Fetches right away, independent of the timer.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// No event is emitted after this returns, including for a fetch that
    /// is still in flight.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            watch_debug!("Poller for {} stopped", self.resource_key);
        }
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Wake {
    Tick,
    Retarget,
    Refresh,
    Stop,
}

struct Poller<T> {
    cache: QueryCache<T>,
    target: watch::Receiver<PageRequest>,
    cadence: watch::Receiver<Duration>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    settings: PollSettings,
    events: mpsc::UnboundedSender<EngineEvent<T>>,
}

impl<T> Poller<T>
where
    T: Send + Sync + 'static,
{
    async fn run(mut self) {
        let mut failures: u32 = 0;
        // Disarmed after an authorization failure until the operator acts.
        let mut armed = true;

        loop {
            let request = self.target.borrow_and_update().clone();
            if self.cancel.is_cancelled() {
                break;
            }
            self.emit(EngineEvent::FetchStarted {
                request: request.clone(),
            });

            let pending = self.cache.fetch(&request);
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = pending => outcome,
            };
            if self.cancel.is_cancelled() {
                break;
            }

            match outcome {
                Ok(page) => {
                    failures = 0;
                    armed = true;
                    self.emit(EngineEvent::PageLoaded {
                        request,
                        page,
                        observed_at: Utc::now(),
                    });
                }
                Err(error) => {
                    if error.class() == ErrorClass::Authorization {
                        watch_warn!("{} denied, polling paused: {}", request, error);
                        armed = false;
                    } else {
                        failures = failures.saturating_add(1);
                        watch_warn!(
                            "{} failed ({} in a row): {}",
                            request,
                            failures,
                            error
                        );
                    }
                    self.emit(EngineEvent::PageFailed { request, error });
                }
            }

            match self.wait(failures, armed).await {
                Wake::Tick => {}
                Wake::Retarget | Wake::Refresh => {
                    failures = 0;
                    armed = true;
                }
                Wake::Stop => break,
            }
        }
        watch_debug!("Poller loop exited");
    }

    async fn wait(&mut self, failures: u32, armed: bool) -> Wake {
        loop {
            let interval = *self.cadence.borrow_and_update();
            let delay = if armed {
                next_delay(interval, failures, self.settings.max_backoff)
            } else {
                None
            };
            let sleep = async move {
                match delay {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Wake::Stop,
                changed = self.target.changed() => {
                    return match changed {
                        Ok(()) => Wake::Retarget,
                        Err(_) => Wake::Stop,
                    };
                }
                _ = self.refresh.notified() => return Wake::Refresh,
                changed = self.cadence.changed() => {
                    if changed.is_err() {
                        return Wake::Stop;
                    }
                    // Re-arm with the new interval.
                }
                _ = sleep => return Wake::Tick,
            }
        }
    }

    fn emit(&self, event: EngineEvent<T>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.events.send(event);
    }
}
