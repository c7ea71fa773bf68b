//! Jobwatch engine: HTTP page sources, the shared query cache and the
//! pollers that keep mounted lists fresh.
mod cache;
mod engine;
mod poller;
mod source;
mod types;

pub use cache::{CacheState, FetchResult, PendingFetch, QueryCache};
pub use engine::EngineHandle;
pub use poller::{next_delay, PollCadence, PollSettings, PollerHandle};
pub use source::{
    AlertSummary, AnalysisDetail, AnalysisSummary, ApiClient, FileSummary, IntoJobItem,
    JobListSource, PageSource, SourceSettings, StreamSummary, WireSource,
};
pub use types::{EngineEvent, FailureKind, FetchError};
