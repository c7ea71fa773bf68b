use std::collections::VecDeque;

use jobwatch_logging::watch_debug;

use crate::CompletionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Empty,
    HasPending,
}

/// FIFO of completion events waiting for the operator. Only the head is
/// ever presented; both consumer actions pop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationQueue<S> {
    pending: VecDeque<CompletionEvent<S>>,
}

impl<S> Default for NotificationQueue<S> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl<S> NotificationQueue<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends events in order. An empty batch is a no-op.
    pub fn push(&mut self, events: impl IntoIterator<Item = CompletionEvent<S>>) {
        let before = self.pending.len();
        self.pending.extend(events);
        let added = self.pending.len() - before;
        if added > 0 {
            watch_debug!(
                "Queued {} completion notice(s), {} pending",
                added,
                self.pending.len()
            );
        }
    }

    pub fn peek_head(&self) -> Option<&CompletionEvent<S>> {
        self.pending.front()
    }

    /// Drops the head. No-op on an empty queue.
    pub fn dismiss(&mut self) {
        if self.pending.pop_front().is_some() {
            watch_debug!("Notice dismissed, {} pending", self.pending.len());
        }
    }

    /// Pops the head and hands it to the caller to act on.
    pub fn act_on_head(&mut self) -> Option<CompletionEvent<S>> {
        let head = self.pending.pop_front()?;
        watch_debug!(
            "Acting on notice for job {}, {} pending",
            head.item.id,
            self.pending.len()
        );
        Some(head)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn state(&self) -> QueueState {
        if self.pending.is_empty() {
            QueueState::Empty
        } else {
            QueueState::HasPending
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionEvent<S>> {
        self.pending.iter()
    }
}
