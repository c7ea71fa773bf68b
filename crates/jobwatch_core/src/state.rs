use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::page::page_links;
use crate::view_model::{JobRowView, ListStatus, ListViewModel, NoticeView};
use crate::{
    CompletionEvent, ErrorClass, JobItem, LoadError, NotificationQueue, Page, PageRequest,
    ResourceKey, SnapshotScope, StatusPhases, TransitionDetector,
};

/// State of one paginated job list: the page on screen, the transition
/// detector fed by every resolved page, and the notices waiting for the
/// operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState<S> {
    resource_key: ResourceKey,
    page: u32,
    page_size: u32,
    filters: BTreeMap<String, String>,
    data: Option<Arc<Page<JobItem<S>>>>,
    fetching: bool,
    error: Option<LoadError>,
    detector: TransitionDetector<S>,
    queue: NotificationQueue<S>,
    navigating: Option<CompletionEvent<S>>,
    mounted: bool,
    dirty: bool,
}

impl<S> ListState<S>
where
    S: Clone + Eq + Hash,
{
    pub fn new(
        resource_key: impl Into<ResourceKey>,
        page_size: u32,
        phases: StatusPhases<S>,
        scope: SnapshotScope,
    ) -> Self {
        Self {
            resource_key: resource_key.into(),
            page: 1,
            page_size: page_size.max(1),
            filters: BTreeMap::new(),
            data: None,
            fetching: false,
            error: None,
            detector: TransitionDetector::new(phases, scope),
            queue: NotificationQueue::new(),
            navigating: None,
            mounted: false,
            dirty: false,
        }
    }

    pub fn resource_key(&self) -> &ResourceKey {
        &self.resource_key
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn queue(&self) -> &NotificationQueue<S> {
        &self.queue
    }

    pub fn is_navigating(&self) -> bool {
        self.navigating.is_some()
    }

    /// The request the list wants on screen right now.
    pub fn current_request(&self) -> PageRequest {
        PageRequest::new(self.resource_key.clone(), self.page, self.page_size)
            .with_filters(self.filters.clone())
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub(crate) fn mount(&mut self) {
        self.mounted = true;
        self.fetching = true;
        self.error = None;
        self.detector.forget(&self.resource_key);
        self.dirty = true;
    }

    /// The queue and the detection baseline do not survive an unmount.
    pub(crate) fn unmount(&mut self) {
        self.mounted = false;
        self.fetching = false;
        self.navigating = None;
        self.queue = NotificationQueue::new();
        self.detector.forget(&self.resource_key);
        self.dirty = true;
    }

    /// Pages outside `1..=total_pages` of the last resolved page are
    /// rejected, as is any change before the first page arrived. Page 1
    /// stays reachable when the last page came back empty.
    pub(crate) fn move_to_page(&mut self, page: u32) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        let last_page = data.total_pages.max(1);
        if page < 1 || page > last_page || page == self.page {
            return false;
        }
        self.page = page;
        self.fetching = true;
        self.dirty = true;
        true
    }

    pub(crate) fn set_filters(&mut self, filters: BTreeMap<String, String>) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.page = 1;
        self.fetching = true;
        self.dirty = true;
        true
    }

    pub(crate) fn mark_fetching(&mut self) {
        if !self.fetching {
            self.fetching = true;
            self.dirty = true;
        }
    }

    pub(crate) fn apply_page(
        &mut self,
        page: Arc<Page<JobItem<S>>>,
        observed_at: chrono::DateTime<chrono::Utc>,
    ) {
        let events = self
            .detector
            .observe(&self.resource_key, &page.items, observed_at);
        self.queue.push(events);
        self.data = Some(page);
        self.error = None;
        self.fetching = false;
        self.dirty = true;
    }

    pub(crate) fn apply_error(&mut self, error: LoadError) {
        self.error = Some(error);
        self.fetching = false;
        self.dirty = true;
    }

    pub(crate) fn dismiss_notice(&mut self) -> bool {
        if self.navigating.is_some() || self.queue.is_empty() {
            return false;
        }
        self.queue.dismiss();
        self.dirty = true;
        true
    }

    pub(crate) fn begin_navigation(&mut self) -> Option<crate::JobId> {
        if self.navigating.is_some() {
            return None;
        }
        let event = self.queue.act_on_head()?;
        let job_id = event.item.id.clone();
        self.navigating = Some(event);
        self.dirty = true;
        Some(job_id)
    }

    pub(crate) fn finish_navigation(&mut self) {
        if self.navigating.take().is_some() {
            self.dirty = true;
        }
    }
}

impl<S> ListState<S>
where
    S: Clone + Eq + Hash + fmt::Display,
{
    pub fn view(&self) -> ListViewModel {
        let status = match (&self.error, &self.data) {
            _ if !self.mounted => ListStatus::Idle,
            (Some(error), _) if error.class == ErrorClass::Authorization => {
                ListStatus::AccessDenied
            }
            (Some(_), _) => ListStatus::Failed,
            (None, None) => ListStatus::Loading,
            (None, Some(_)) if self.fetching => ListStatus::Refetching,
            (None, Some(_)) => ListStatus::Ready,
        };

        let rows = self
            .data
            .as_ref()
            .map(|data| data.items.iter().map(row_view).collect())
            .unwrap_or_default();

        let (total_items, total_pages) = self
            .data
            .as_ref()
            .map_or((0, 0), |data| (data.total_items, data.total_pages));

        let summary = self.data.as_ref().and_then(|data| {
            (data.total_items > 0).then(|| {
                format!(
                    "Showing {} of {} items. Page {} of {}.",
                    data.items.len(),
                    data.total_items,
                    self.page,
                    data.total_pages
                )
            })
        });

        let notice = match &self.navigating {
            Some(_) => None,
            None => self.queue.peek_head().map(|head| NoticeView {
                job_id: head.item.id.clone(),
                label: head.item.display_label.clone(),
                status: status_label(head.item.status.as_ref()),
                observed_at: head.observed_at,
                pending_behind: self.queue.len().saturating_sub(1),
            }),
        };

        ListViewModel {
            resource_key: self.resource_key.clone(),
            status,
            rows,
            page: self.page,
            total_items,
            total_pages,
            links: page_links(self.page, total_pages),
            summary,
            error: self.error.as_ref().map(ToString::to_string),
            is_fetching: self.fetching,
            notice,
            navigating_to: self.navigating.as_ref().map(|event| event.item.id.clone()),
        }
    }
}

fn row_view<S: fmt::Display>(item: &JobItem<S>) -> JobRowView {
    JobRowView {
        job_id: item.id.clone(),
        label: item.display_label.clone(),
        status: status_label(item.status.as_ref()),
    }
}

fn status_label<S: fmt::Display>(status: Option<&S>) -> String {
    status.map_or_else(|| "Unknown".to_string(), ToString::to_string)
}
