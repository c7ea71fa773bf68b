use std::fmt;

/// How a failed page load should be presented and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network or HTTP failure; the next poll retries it.
    Transport,
    /// The caller lacks permission; not retried automatically.
    Authorization,
}

/// A failed page load as seen by the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub class: ErrorClass,
    pub message: String,
}

impl LoadError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transport,
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Authorization,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            ErrorClass::Transport => write!(f, "transport error: {}", self.message),
            ErrorClass::Authorization => write!(f, "access denied: {}", self.message),
        }
    }
}
