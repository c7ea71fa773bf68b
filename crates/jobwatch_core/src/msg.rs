use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{JobItem, LoadError, Page, PageRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg<S> {
    /// The list view became visible.
    Mounted,
    /// The list view went away; pending results are dropped from now on.
    Unmounted,
    /// User picked a page number from the pagination bar.
    PageRequested(u32),
    NextPage,
    PreviousPage,
    /// User changed the list filters; resets to the first page.
    FiltersChanged(BTreeMap<String, String>),
    /// The engine issued a fetch for this request.
    FetchStarted(PageRequest),
    /// The engine resolved a page.
    PageLoaded {
        request: PageRequest,
        page: Arc<Page<JobItem<S>>>,
        observed_at: DateTime<Utc>,
    },
    /// The engine failed to resolve a page.
    PageFailed {
        request: PageRequest,
        error: LoadError,
    },
    /// User clicked Refresh.
    RefreshClicked,
    /// User dismissed the completion notice.
    DismissClicked,
    /// User asked to open the completed job.
    GoToDetailClicked,
    /// The detail navigation started by `GoToDetailClicked` is over.
    NavigationFinished,
}
