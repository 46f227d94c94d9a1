use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use scrape_core::{ErrorRecord, ExtractionOutcome, RunSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    RunStarted {
        targets: usize,
        workers: usize,
    },
    AttemptStarted {
        title: String,
        url: String,
        attempt: u32,
    },
    AttemptFailed {
        title: String,
        attempt: u32,
        max_retries: u32,
        error: ErrorRecord,
    },
    BackoffScheduled {
        title: String,
        next_attempt: u32,
        delay: Duration,
    },
    ConverterFallback {
        title: String,
        attempt: u32,
        reason: String,
    },
    Saved {
        title: String,
        path: PathBuf,
        chars: usize,
    },
    Exhausted {
        title: String,
        attempts: u32,
        error: ErrorRecord,
    },
    TargetCompleted(ExtractionOutcome),
    RunFinished(RunSummary),
}

/// Receives structured events from pipelines and the orchestrator.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events to the global logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { targets, workers } => {
                engine_info!("Processing {} URLs with {} workers...", targets, workers);
            }
            PipelineEvent::AttemptStarted {
                title,
                url,
                attempt,
            } => {
                engine_info!("Fetching: {} (title={} attempt={})", url, title, attempt);
            }
            PipelineEvent::AttemptFailed {
                title,
                attempt,
                max_retries,
                error,
            } => {
                engine_error!(
                    "Attempt {}/{} failed for {}: {}",
                    attempt,
                    max_retries,
                    title,
                    error
                );
            }
            PipelineEvent::BackoffScheduled {
                title,
                next_attempt,
                delay,
            } => {
                engine_debug!(
                    "Backing off {:?} before attempt {} for {}",
                    delay,
                    next_attempt,
                    title
                );
            }
            PipelineEvent::ConverterFallback {
                title,
                attempt,
                reason,
            } => {
                engine_warn!(
                    "Markdown conversion failed for {} (attempt {}), saved plain text: {}",
                    title,
                    attempt,
                    reason
                );
            }
            PipelineEvent::Saved { title, path, chars } => {
                engine_info!("Saved: {:?} ({} chars, title={})", path, chars, title);
            }
            PipelineEvent::Exhausted {
                title,
                attempts,
                error,
            } => {
                engine_error!(
                    "All retries exhausted for {} after {} attempts: {}",
                    title,
                    attempts,
                    error
                );
            }
            PipelineEvent::TargetCompleted(outcome) => match outcome.error() {
                None => engine_info!(
                    "Successfully processed: {} (attempts={})",
                    outcome.target.title,
                    outcome.attempts
                ),
                Some(error) => engine_error!(
                    "Failed: {} (attempts={}): {}",
                    outcome.target.title,
                    outcome.attempts,
                    error
                ),
            },
            PipelineEvent::RunFinished(summary) => {
                engine_info!(
                    "Run finished: {} succeeded, {} failed, {} total",
                    summary.succeeded,
                    summary.failed,
                    summary.total
                );
            }
        }
    }
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}
