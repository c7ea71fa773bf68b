use jobwatch_core::{AnalysisStatus, Effect, JobId, JobItem};
use jobwatch_engine::{AnalysisDetail, ApiClient, EngineEvent, EngineHandle, FetchError};
use jobwatch_logging::{watch_debug, watch_info};
use tokio::sync::mpsc;

pub type AnalysisEvent = EngineEvent<JobItem<AnalysisStatus>>;

/// Result of opening a finished job.
#[derive(Debug)]
pub struct DetailOutcome {
    pub job_id: JobId,
    pub result: Result<AnalysisDetail, FetchError>,
}

/// Carries out the effects emitted by the list state machine.
pub struct EffectRunner {
    engine: EngineHandle<JobItem<AnalysisStatus>>,
    client: ApiClient,
    details: mpsc::UnboundedSender<DetailOutcome>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle<JobItem<AnalysisStatus>>,
        client: ApiClient,
        details: mpsc::UnboundedSender<DetailOutcome>,
    ) -> Self {
        Self {
            engine,
            client,
            details,
        }
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            watch_debug!("Effect {:?}", effect);
            match effect {
                Effect::StartPolling(request) => self.engine.start(request),
                Effect::RetargetPolling(request) => self.engine.set_target(request),
                Effect::StopPolling(resource_key) => {
                    self.engine.stop(&resource_key);
                }
                Effect::RefreshAll => self.engine.refresh_all(),
                Effect::NavigateToDetail { job_id } => self.open_detail(job_id),
            }
        }
    }

    fn open_detail(&self, job_id: JobId) {
        watch_info!("Navigating to {}", ApiClient::detail_route(&job_id));
        let client = self.client.clone();
        let details = self.details.clone();
        tokio::spawn(async move {
            let result = client.analysis_detail(&job_id).await;
            let _ = details.send(DetailOutcome { job_id, result });
        });
    }

    pub async fn next_event(&mut self) -> Option<AnalysisEvent> {
        self.engine.recv().await
    }
}
