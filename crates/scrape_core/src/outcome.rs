use std::fmt;
use std::path::{Path, PathBuf};

use crate::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Session could not be opened, navigation failed, timed out or returned nothing.
    Render,
    /// Output directory or file could not be written.
    Persistence,
    /// The worker running the target failed unexpectedly.
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Render => write!(f, "render failure"),
            FailureKind::Persistence => write!(f, "persistence failure"),
            FailureKind::Panicked => write!(f, "worker panicked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: FailureKind,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Render, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Persistence, message)
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Panicked, message)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success { content: String, path: PathBuf },
    Failure { error: ErrorRecord },
}

/// Terminal result of all attempts for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub target: Target,
    pub status: OutcomeStatus,
    pub attempts: u32,
}

impl ExtractionOutcome {
    pub fn success(target: Target, content: String, path: PathBuf, attempts: u32) -> Self {
        Self {
            target,
            status: OutcomeStatus::Success { content, path },
            attempts,
        }
    }

    pub fn failure(target: Target, error: ErrorRecord, attempts: u32) -> Self {
        Self {
            target,
            status: OutcomeStatus::Failure { error },
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Success { content, .. } => Some(content),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.status {
            OutcomeStatus::Success { path, .. } => Some(path),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { error } => Some(error),
        }
    }
}

/// Aggregate success/failure counts across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ExtractionOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "Processing complete!")?;
        writeln!(f, "Success: {}/{}", self.succeeded, self.total)?;
        writeln!(f, "Failed: {}/{}", self.failed, self.total)?;
        write!(f, "{rule}")
    }
}
