use std::hash::Hash;

use jobwatch_logging::{watch_debug, watch_trace};

use crate::{Effect, ListState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update<S>(mut state: ListState<S>, msg: Msg<S>) -> (ListState<S>, Vec<Effect>)
where
    S: Clone + Eq + Hash,
{
    // Nothing reaches an unmounted list except a new mount.
    if !state.is_mounted() && !matches!(msg, Msg::Mounted) {
        watch_trace!("Dropping message for unmounted {}", state.resource_key());
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Mounted => {
            if state.is_mounted() {
                Vec::new()
            } else {
                state.mount();
                vec![Effect::StartPolling(state.current_request())]
            }
        }
        Msg::Unmounted => {
            state.unmount();
            vec![Effect::StopPolling(state.resource_key().clone())]
        }
        Msg::PageRequested(page) => change_page(&mut state, page),
        Msg::NextPage => {
            let next = state.page().saturating_add(1);
            change_page(&mut state, next)
        }
        Msg::PreviousPage => {
            let previous = state.page().saturating_sub(1);
            change_page(&mut state, previous)
        }
        Msg::FiltersChanged(filters) => {
            if state.set_filters(filters) {
                vec![Effect::RetargetPolling(state.current_request())]
            } else {
                Vec::new()
            }
        }
        Msg::FetchStarted(request) => {
            if request == state.current_request() {
                state.mark_fetching();
            }
            Vec::new()
        }
        Msg::PageLoaded {
            request,
            page,
            observed_at,
        } => {
            if request == state.current_request() {
                state.apply_page(page, observed_at);
            } else {
                watch_debug!("Ignoring page for superseded request {}", request);
            }
            Vec::new()
        }
        Msg::PageFailed { request, error } => {
            if request == state.current_request() {
                state.apply_error(error);
            } else {
                watch_debug!("Ignoring failure for superseded request {}", request);
            }
            Vec::new()
        }
        Msg::RefreshClicked => {
            state.mark_fetching();
            vec![Effect::RefreshAll]
        }
        Msg::DismissClicked => {
            state.dismiss_notice();
            Vec::new()
        }
        Msg::GoToDetailClicked => match state.begin_navigation() {
            Some(job_id) => vec![Effect::NavigateToDetail { job_id }],
            None => Vec::new(),
        },
        Msg::NavigationFinished => {
            state.finish_navigation();
            Vec::new()
        }
    };

    (state, effects)
}

fn change_page<S>(state: &mut ListState<S>, page: u32) -> Vec<Effect>
where
    S: Clone + Eq + Hash,
{
    if state.move_to_page(page) {
        vec![Effect::RetargetPolling(state.current_request())]
    } else {
        Vec::new()
    }
}
