//! Scrape core: data model and the pure retry state machine.
mod config;
mod outcome;
mod retry;
mod target;

pub use config::{ConfigError, PipelineConfig};
pub use outcome::{ErrorRecord, ExtractionOutcome, FailureKind, OutcomeStatus, RunSummary};
pub use retry::{
    backoff_delay, checked_backoff_delay, update, AttemptMsg, Effect, PipelineState,
};
pub use target::Target;
