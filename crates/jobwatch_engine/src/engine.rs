use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jobwatch_core::{PageRequest, ResourceKey};
use jobwatch_logging::{watch_debug, watch_info};
use tokio::sync::mpsc;

use crate::cache::QueryCache;
use crate::poller::{PollCadence, PollSettings, PollerHandle};
use crate::source::PageSource;
use crate::EngineEvent;

/// Owns the pollers of every mounted list and the cache they share.
///
/// Pollers are spawned on the tokio runtime the handle is used from.
pub struct EngineHandle<T> {
    cache: QueryCache<T>,
    cadence: PollCadence,
    settings: PollSettings,
    pollers: HashMap<ResourceKey, PollerHandle>,
    event_tx: mpsc::UnboundedSender<EngineEvent<T>>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent<T>>,
}

impl<T> EngineHandle<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn PageSource<T>>, cadence: PollCadence, settings: PollSettings) -> Self {
        Self::with_cache(QueryCache::new(source), cadence, settings)
    }

    /// Builds a handle over an existing cache, shared with other readers.
    pub fn with_cache(cache: QueryCache<T>, cadence: PollCadence, settings: PollSettings) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            cache,
            cadence,
            settings,
            pollers: HashMap::new(),
            event_tx,
            event_rx,
        }
    }

    /// Starts polling `request`. A resource that is already polled is
    /// retargeted instead, so there is at most one poller per resource.
    pub fn start(&mut self, request: PageRequest) {
        if let Some(poller) = self.pollers.get(&request.resource_key) {
            poller.retarget(request);
            return;
        }
        watch_info!("Start polling {}", request);
        let poller = PollerHandle::spawn(
            self.cache.clone(),
            request,
            &self.cadence,
            self.settings.clone(),
            self.event_tx.clone(),
        );
        self.pollers.insert(poller.resource_key().clone(), poller);
    }

    /// Switches a running poller to another page or filter set. Starts one
    /// when the resource is not polled yet.
    pub fn set_target(&mut self, request: PageRequest) {
        match self.pollers.get(&request.resource_key) {
            Some(poller) => {
                watch_debug!("Retarget {}", request);
                poller.retarget(request);
            }
            None => self.start(request),
        }
    }

    /// Stops the poller of one resource. Other resources keep polling.
    pub fn stop(&mut self, resource_key: &ResourceKey) -> bool {
        match self.pollers.remove(resource_key) {
            Some(poller) => {
                poller.stop();
                watch_info!("Stop polling {}", resource_key);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (_, poller) in self.pollers.drain() {
            poller.stop();
        }
    }

    /// Marks every cached page stale and refetches each polled resource now.
    pub fn refresh_all(&self) {
        let invalidated = self.cache.invalidate_all();
        watch_info!(
            "Refreshing {} resources ({} cached pages invalidated)",
            self.pollers.len(),
            invalidated
        );
        for poller in self.pollers.values() {
            poller.refresh();
        }
    }

    pub fn set_interval(&self, interval: Duration) {
        self.cadence.set_interval(interval);
    }

    pub fn cadence(&self) -> &PollCadence {
        &self.cadence
    }

    pub fn is_polling(&self, resource_key: &ResourceKey) -> bool {
        self.pollers.contains_key(resource_key)
    }

    pub fn active_resources(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.pollers.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn cache(&self) -> &QueryCache<T> {
        &self.cache
    }

    /// Waits for the next event. Never returns `None` while the handle is
    /// alive since it keeps a sender of its own.
    pub async fn recv(&mut self) -> Option<EngineEvent<T>> {
        self.event_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent<T>> {
        self.event_rx.try_recv().ok()
    }
}
