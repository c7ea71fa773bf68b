use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobwatch_core::{ErrorClass, JobItem, LoadError, Msg, Page, PageRequest};

#[derive(Debug)]
pub enum EngineEvent<T> {
    FetchStarted {
        request: PageRequest,
    },
    PageLoaded {
        request: PageRequest,
        page: Arc<Page<T>>,
        observed_at: DateTime<Utc>,
    },
    PageFailed {
        request: PageRequest,
        error: FetchError,
    },
}

impl<T> EngineEvent<T> {
    pub fn request(&self) -> &PageRequest {
        match self {
            EngineEvent::FetchStarted { request }
            | EngineEvent::PageLoaded { request, .. }
            | EngineEvent::PageFailed { request, .. } => request,
        }
    }
}

impl<S> EngineEvent<JobItem<S>> {
    /// Translates the event into the list state machine's vocabulary.
    pub fn into_msg(self) -> Msg<S> {
        match self {
            EngineEvent::FetchStarted { request } => Msg::FetchStarted(request),
            EngineEvent::PageLoaded {
                request,
                page,
                observed_at,
            } => Msg::PageLoaded {
                request,
                page,
                observed_at,
            },
            EngineEvent::PageFailed { request, error } => Msg::PageFailed {
                request,
                error: error.to_load_error(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind {
            FailureKind::Unauthorized(_) => ErrorClass::Authorization,
            _ => ErrorClass::Transport,
        }
    }

    /// Authorization failures wait for operator action; everything else is
    /// retried by the next poll.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transport
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::HttpStatus(404)
    }

    pub fn to_load_error(&self) -> LoadError {
        LoadError {
            class: self.class(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// No endpoint is configured for the resource key.
    UnknownResource,
    HttpStatus(u16),
    /// 401 or 403.
    Unauthorized(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::UnknownResource => write!(f, "unknown resource"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Unauthorized(code) => write!(f, "unauthorized ({code})"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}
