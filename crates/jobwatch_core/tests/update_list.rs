use std::collections::BTreeMap;
use std::sync::{Arc, Once};

use chrono::{DateTime, TimeZone, Utc};
use jobwatch_core::{
    update, AnalysisStatus, Effect, JobId, JobItem, ListState, ListStatus, LoadError, Msg, Page,
    PageLink, PageRequest, SnapshotScope,
};
use pretty_assertions::assert_eq;

use jobwatch_core::AnalysisStatus::{Completed, InProgress, Pending};

const PAGE_SIZE: u32 = 2;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jobwatch_logging::initialize_for_tests);
}

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, second).unwrap()
}

fn job(id: &str, status: AnalysisStatus) -> JobItem<AnalysisStatus> {
    JobItem::new(id, status, format!("{id}.pcap"))
}

fn new_list() -> ListState<AnalysisStatus> {
    ListState::new(
        "analyses",
        PAGE_SIZE,
        AnalysisStatus::phases(),
        SnapshotScope::Resource,
    )
}

fn request(page: u32) -> PageRequest {
    PageRequest::new("analyses", page, PAGE_SIZE)
}

fn loaded(
    page: u32,
    total: u64,
    items: Vec<JobItem<AnalysisStatus>>,
    second: u32,
) -> Msg<AnalysisStatus> {
    Msg::PageLoaded {
        request: request(page),
        page: Arc::new(Page::new(items, total, page, PAGE_SIZE)),
        observed_at: at(second),
    }
}

fn mounted() -> ListState<AnalysisStatus> {
    let (state, _) = update(new_list(), Msg::Mounted);
    state
}

/// Mounted list whose queue holds notices for `ids`, oldest first.
fn with_notices(ids: &[&str]) -> ListState<AnalysisStatus> {
    let running = ids.iter().map(|id| job(id, InProgress)).collect();
    let done = ids.iter().map(|id| job(id, Completed)).collect();
    let (state, _) = update(mounted(), loaded(1, ids.len() as u64, running, 0));
    let (state, _) = update(state, loaded(1, ids.len() as u64, done, 5));
    state
}

fn notice_id(state: &ListState<AnalysisStatus>) -> Option<JobId> {
    state.view().notice.map(|notice| notice.job_id)
}

#[test]
fn mount_starts_polling_the_first_page() {
    init_logging();
    let (mut state, effects) = update(new_list(), Msg::Mounted);

    assert_eq!(effects, vec![Effect::StartPolling(request(1))]);
    assert_eq!(state.view().status, ListStatus::Loading);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());

    let (_state, effects) = update(state, Msg::Mounted);
    assert!(effects.is_empty());
}

#[test]
fn completion_between_polls_raises_a_notice() {
    init_logging();
    let state = mounted();

    let (state, _) = update(state, loaded(1, 1, vec![job("j1", InProgress)], 0));
    let view = state.view();
    assert_eq!(view.status, ListStatus::Ready);
    assert!(view.notice.is_none());

    let (state, _) = update(state, loaded(1, 1, vec![job("j1", Completed)], 5));
    let notice = state.view().notice.expect("notice for j1");
    assert_eq!(notice.job_id, JobId::new("j1"));
    assert_eq!(notice.label, "j1.pcap");
    assert_eq!(notice.status, "Completed");
    assert_eq!(notice.observed_at, at(5));
    assert_eq!(notice.pending_behind, 0);

    let (state, effects) = update(state, Msg::DismissClicked);
    assert!(effects.is_empty());
    assert!(state.view().notice.is_none());
    assert!(state.queue().is_empty());
}

#[test]
fn already_finished_jobs_do_not_notify_on_first_load() {
    init_logging();
    let (state, _) = update(
        mounted(),
        loaded(1, 2, vec![job("a", Completed), job("b", Completed)], 0),
    );
    assert!(state.queue().is_empty());
}

#[test]
fn notices_are_presented_one_at_a_time() {
    init_logging();
    let state = with_notices(&["a", "b"]);
    assert_eq!(state.queue().len(), 2);
    assert_eq!(notice_id(&state), Some(JobId::new("a")));
    assert_eq!(state.view().notice.unwrap().pending_behind, 1);

    let (state, _) = update(state, Msg::DismissClicked);
    assert_eq!(notice_id(&state), Some(JobId::new("b")));
    let (state, _) = update(state, Msg::DismissClicked);
    assert_eq!(notice_id(&state), None);
}

#[test]
fn go_to_detail_navigates_and_holds_the_next_notice() {
    init_logging();
    let state = with_notices(&["a", "b"]);

    let (state, effects) = update(state, Msg::GoToDetailClicked);
    assert_eq!(
        effects,
        vec![Effect::NavigateToDetail {
            job_id: JobId::new("a")
        }]
    );
    let view = state.view();
    assert!(view.notice.is_none());
    assert_eq!(view.navigating_to, Some(JobId::new("a")));

    // Double click and dismiss are ignored while navigating.
    let (state, effects) = update(state, Msg::GoToDetailClicked);
    assert!(effects.is_empty());
    let (state, _) = update(state, Msg::DismissClicked);
    assert_eq!(state.queue().len(), 1);

    let (state, _) = update(state, Msg::NavigationFinished);
    assert!(!state.is_navigating());
    assert_eq!(notice_id(&state), Some(JobId::new("b")));
}

#[test]
fn go_to_detail_without_notice_does_nothing() {
    init_logging();
    let (state, effects) = update(mounted(), Msg::GoToDetailClicked);
    assert!(effects.is_empty());
    assert!(!state.is_navigating());
}

#[test]
fn transitions_keep_accumulating_while_navigating() {
    init_logging();
    let (state, _) = update(
        mounted(),
        loaded(1, 2, vec![job("a", InProgress), job("b", Pending)], 0),
    );
    let (state, _) = update(
        state,
        loaded(1, 2, vec![job("a", Completed), job("b", Pending)], 5),
    );
    let (state, _) = update(state, Msg::GoToDetailClicked);
    let (state, _) = update(
        state,
        loaded(1, 2, vec![job("a", Completed), job("b", Completed)], 10),
    );

    assert!(state.view().notice.is_none());
    assert_eq!(state.queue().len(), 1);
    let (state, _) = update(state, Msg::NavigationFinished);
    assert_eq!(notice_id(&state), Some(JobId::new("b")));
}

#[test]
fn page_changes_are_clamped_to_known_pages() {
    init_logging();
    let state = mounted();

    // No page resolved yet: nothing to navigate.
    let (state, effects) = update(state, Msg::NextPage);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        loaded(1, 5, vec![job("a", Completed), job("b", Completed)], 0),
    );
    assert_eq!(state.view().total_pages, 3);

    let (state, effects) = update(state, Msg::PreviousPage);
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::PageRequested(9));
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::NextPage);
    assert_eq!(effects, vec![Effect::RetargetPolling(request(2))]);
    assert_eq!(state.page(), 2);
    assert_eq!(state.view().status, ListStatus::Refetching);

    let (state, effects) = update(state, Msg::PageRequested(3));
    assert_eq!(effects, vec![Effect::RetargetPolling(request(3))]);
    assert_eq!(state.current_request(), request(3));
}

#[test]
fn emptied_page_can_return_to_the_first_page() {
    init_logging();
    let (state, _) = update(
        mounted(),
        loaded(1, 6, vec![job("a", Completed), job("b", Completed)], 0),
    );
    let (state, _) = update(state, Msg::PageRequested(3));

    // The collection vanished while paging: page 3 comes back empty.
    let msg = Msg::PageLoaded {
        request: request(3),
        page: Arc::new(Page::empty(3, PAGE_SIZE)),
        observed_at: at(5),
    };
    let (state, _) = update(state, msg);
    assert_eq!(state.view().total_pages, 0);

    let (state, effects) = update(state, Msg::PageRequested(2));
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::PageRequested(1));
    assert_eq!(effects, vec![Effect::RetargetPolling(request(1))]);
    assert_eq!(state.page(), 1);
}

#[test]
fn results_for_a_superseded_page_are_ignored() {
    init_logging();
    let (state, _) = update(
        mounted(),
        loaded(1, 4, vec![job("a", InProgress), job("b", InProgress)], 0),
    );
    let (state, _) = update(state, Msg::PageRequested(2));

    // A late page-1 result arrives after the switch.
    let (state, _) = update(
        state,
        loaded(1, 4, vec![job("a", Completed), job("b", Completed)], 3),
    );
    assert!(state.queue().is_empty());
    assert_eq!(state.view().rows[0].job_id, JobId::new("a"));
    assert_eq!(state.view().rows[0].status, "Processing");
    assert!(state.view().is_fetching);

    let (state, _) = update(
        state,
        Msg::PageFailed {
            request: request(1),
            error: LoadError::transport("late"),
        },
    );
    assert!(state.view().error.is_none());
}

#[test]
fn failures_keep_rows_queue_and_polling() {
    init_logging();
    let state = with_notices(&["a"]);

    let (state, effects) = update(
        state,
        Msg::PageFailed {
            request: request(1),
            error: LoadError::transport("connection reset"),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, ListStatus::Failed);
    assert_eq!(view.error.as_deref(), Some("transport error: connection reset"));
    assert_eq!(view.rows.len(), 1);
    assert_eq!(state.queue().len(), 1);

    // A later successful poll clears the error.
    let (state, _) = update(state, loaded(1, 1, vec![job("a", Completed)], 9));
    assert_eq!(state.view().status, ListStatus::Ready);
    assert!(state.view().error.is_none());
}

#[test]
fn authorization_failures_show_access_denied() {
    init_logging();
    let (state, _) = update(
        mounted(),
        Msg::PageFailed {
            request: request(1),
            error: LoadError::authorization("403 Forbidden"),
        },
    );
    let view = state.view();
    assert_eq!(view.status, ListStatus::AccessDenied);
    assert!(view.rows.is_empty());
}

#[test]
fn refresh_requests_a_global_refetch() {
    init_logging();
    let (state, _) = update(mounted(), loaded(1, 1, vec![job("a", Pending)], 0));
    let (state, effects) = update(state, Msg::RefreshClicked);
    assert_eq!(effects, vec![Effect::RefreshAll]);
    assert_eq!(state.view().status, ListStatus::Refetching);
}

#[test]
fn fetch_started_marks_the_list_as_fetching() {
    init_logging();
    let (state, _) = update(mounted(), loaded(1, 1, vec![job("a", Pending)], 0));
    assert!(!state.view().is_fetching);

    let (state, _) = update(state, Msg::FetchStarted(request(7)));
    assert!(!state.view().is_fetching);
    let (state, _) = update(state, Msg::FetchStarted(request(1)));
    assert!(state.view().is_fetching);
}

#[test]
fn filter_change_resets_to_first_page() {
    init_logging();
    let (state, _) = update(
        mounted(),
        loaded(1, 6, vec![job("a", Pending), job("b", Pending)], 0),
    );
    let (state, _) = update(state, Msg::PageRequested(2));

    let filters = BTreeMap::from([("status".to_string(), "failed".to_string())]);
    let (state, effects) = update(state, Msg::FiltersChanged(filters.clone()));
    let expected = request(1).with_filters(filters.clone());
    assert_eq!(effects, vec![Effect::RetargetPolling(expected.clone())]);
    assert_eq!(state.current_request(), expected);

    let (_state, effects) = update(state, Msg::FiltersChanged(filters));
    assert!(effects.is_empty());
}

#[test]
fn unmount_stops_polling_and_drops_late_results() {
    init_logging();
    let state = with_notices(&["a"]);

    let (state, effects) = update(state, Msg::Unmounted);
    assert_eq!(
        effects,
        vec![Effect::StopPolling(jobwatch_core::ResourceKey::new("analyses"))]
    );
    assert_eq!(state.view().status, ListStatus::Idle);
    assert!(state.queue().is_empty());

    let (state, effects) = update(state, loaded(1, 1, vec![job("a", Completed)], 30));
    assert!(effects.is_empty());
    assert!(state.queue().is_empty());
    let (_state, effects) = update(state, Msg::Unmounted);
    assert!(effects.is_empty());
}

#[test]
fn remount_starts_from_a_fresh_baseline() {
    init_logging();
    let (state, _) = update(mounted(), loaded(1, 1, vec![job("a", InProgress)], 0));
    let (state, _) = update(state, Msg::Unmounted);
    let (state, _) = update(state, Msg::Mounted);

    let (state, _) = update(state, loaded(1, 1, vec![job("a", Completed)], 10));
    assert!(state.queue().is_empty());
}

#[test]
fn view_renders_pagination_and_summary() {
    init_logging();
    let (state, _) = update(
        mounted(),
        loaded(1, 9, vec![job("a", Pending), job("b", Completed)], 0),
    );
    let view = state.view();
    assert_eq!(
        view.summary.as_deref(),
        Some("Showing 2 of 9 items. Page 1 of 5.")
    );
    assert_eq!(
        view.links,
        vec![
            PageLink::Page {
                number: 1,
                current: true
            },
            PageLink::Page {
                number: 2,
                current: false
            },
            PageLink::Ellipsis,
            PageLink::Page {
                number: 5,
                current: false
            },
        ]
    );
    let statuses: Vec<&str> = view.rows.iter().map(|row| row.status.as_str()).collect();
    assert_eq!(statuses, vec!["Pending", "Completed"]);
}

#[test]
fn empty_collection_has_no_summary() {
    init_logging();
    let msg = Msg::PageLoaded {
        request: request(1),
        page: Arc::new(Page::empty(1, PAGE_SIZE)),
        observed_at: at(0),
    };
    let (state, _) = update(mounted(), msg);
    let view = state.view();
    assert_eq!(view.status, ListStatus::Ready);
    assert!(view.summary.is_none());
    assert!(view.links.is_empty());
}
