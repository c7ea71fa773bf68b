use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse classification of a job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InProgress,
    Terminal,
}

/// Explicit mapping from a job type's status enumeration to phases.
///
/// Statuses listed in neither set classify to `None` and are never part of
/// a completion edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPhases<S> {
    in_progress: Vec<S>,
    terminal: Vec<S>,
}

impl<S: PartialEq> StatusPhases<S> {
    pub fn new(in_progress: Vec<S>, terminal: Vec<S>) -> Self {
        Self {
            in_progress,
            terminal,
        }
    }

    pub fn classify(&self, status: &S) -> Option<Phase> {
        if self.in_progress.contains(status) {
            Some(Phase::InProgress)
        } else if self.terminal.contains(status) {
            Some(Phase::Terminal)
        } else {
            None
        }
    }

    /// True only for the in-progress -> terminal edge.
    pub fn is_completion(&self, previous: &S, current: &S) -> bool {
        self.classify(previous) == Some(Phase::InProgress)
            && self.classify(current) == Some(Phase::Terminal)
    }
}

/// Status of a capture-file analysis job as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub const ALL: [AnalysisStatus; 4] = [
        AnalysisStatus::Pending,
        AnalysisStatus::InProgress,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ];

    /// Pending and running analyses are in progress; completed and failed
    /// ones are terminal.
    pub fn phases() -> StatusPhases<AnalysisStatus> {
        StatusPhases::new(
            vec![AnalysisStatus::Pending, AnalysisStatus::InProgress],
            vec![AnalysisStatus::Completed, AnalysisStatus::Failed],
        )
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::InProgress => "in_progress",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "Pending",
            AnalysisStatus::InProgress => "Processing",
            AnalysisStatus::Completed => "Completed",
            AnalysisStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for AnalysisStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        AnalysisStatus::ALL
            .into_iter()
            .find(|status| status.as_wire().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(raw.to_string()))
    }
}
