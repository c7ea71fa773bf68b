use std::fmt;

use chrono::{DateTime, Utc};

/// Opaque server-assigned job identifier, stable for the job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One row of a job list. `status` is `None` when the server sent a value
/// outside the job type's status enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobItem<S> {
    pub id: JobId,
    pub status: Option<S>,
    pub display_label: String,
}

impl<S> JobItem<S> {
    pub fn new(id: impl Into<JobId>, status: S, display_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Some(status),
            display_label: display_label.into(),
        }
    }

    pub fn with_unknown_status(id: impl Into<JobId>, display_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
            display_label: display_label.into(),
        }
    }
}

/// A job observed crossing from an in-progress to a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent<S> {
    pub item: JobItem<S>,
    pub observed_at: DateTime<Utc>,
}
