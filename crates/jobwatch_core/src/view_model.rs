use chrono::{DateTime, Utc};

use crate::{JobId, PageLink, ResourceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// Not mounted.
    Idle,
    /// No page resolved yet.
    Loading,
    Ready,
    /// A page is shown while a newer one is being fetched.
    Refetching,
    AccessDenied,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListViewModel {
    pub resource_key: ResourceKey,
    pub status: ListStatus,
    pub rows: Vec<JobRowView>,
    pub page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub links: Vec<PageLink>,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub is_fetching: bool,
    /// The blocking completion notice, if one should be shown.
    pub notice: Option<NoticeView>,
    pub navigating_to: Option<JobId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub label: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeView {
    pub job_id: JobId,
    pub label: String,
    pub status: String,
    pub observed_at: DateTime<Utc>,
    /// Notices queued behind this one.
    pub pending_behind: usize,
}
