use crate::{JobId, PageRequest, ResourceKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start polling the resource, fetching `request` right away.
    StartPolling(PageRequest),
    /// Point the running poller at a new page or filter set.
    RetargetPolling(PageRequest),
    StopPolling(ResourceKey),
    /// Invalidate every cached page and refetch all polled resources.
    RefreshAll,
    NavigateToDetail { job_id: JobId },
}
