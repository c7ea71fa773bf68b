//! Jobwatch core: job-list data model, completion detection, the
//! notification queue, and the pure list state machine.
mod detector;
mod effect;
mod error;
mod job;
mod msg;
mod page;
mod queue;
mod state;
mod status;
mod update;
mod view_model;

pub use detector::{SnapshotScope, TransitionDetector};
pub use effect::Effect;
pub use error::{ErrorClass, LoadError};
pub use job::{CompletionEvent, JobId, JobItem};
pub use msg::Msg;
pub use page::{page_links, total_pages, Page, PageLink, PageRequest, ResourceKey};
pub use queue::{NotificationQueue, QueueState};
pub use state::ListState;
pub use status::{AnalysisStatus, Phase, StatusPhases, UnknownStatus};
pub use update::update;
pub use view_model::{JobRowView, ListStatus, ListViewModel, NoticeView};
