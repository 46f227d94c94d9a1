use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use scrape_core::{ErrorRecord, ExtractionOutcome, RunSummary, Target};
use tokio::sync::mpsc;

use crate::convert::panic_message;
use crate::events::PipelineEvent;
use crate::pipeline::ExtractionPipeline;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// In completion order.
    pub outcomes: Vec<ExtractionOutcome>,
    pub summary: RunSummary,
}

/// Runs one pipeline per target on a fixed pool of workers.
pub struct Orchestrator {
    pipeline: Arc<ExtractionPipeline>,
}

impl Orchestrator {
    pub fn new(pipeline: ExtractionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Each worker takes the next queued target and runs it to completion
    /// before taking another, so at most `max_concurrency` runs are in flight.
    /// A `max_concurrency` of zero is treated as one.
    pub async fn run_all(&self, targets: Vec<Target>, max_concurrency: usize) -> RunReport {
        let total = targets.len();
        let workers = max_concurrency.max(1).min(total.max(1));
        let sink = self.pipeline.sink().clone();
        sink.emit(PipelineEvent::RunStarted {
            targets: total,
            workers,
        });

        let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let queue = queue.clone();
            let tx = tx.clone();
            let pipeline = self.pipeline.clone();
            handles.push(tokio::spawn(async move {
                while let Some(target) = next_target(&queue) {
                    let outcome = run_isolated(pipeline.clone(), target).await;
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            sink.emit(PipelineEvent::TargetCompleted(outcome.clone()));
            outcomes.push(outcome);
        }
        for handle in handles {
            let _ = handle.await;
        }

        let summary = RunSummary::from_outcomes(&outcomes);
        sink.emit(PipelineEvent::RunFinished(summary));
        RunReport { outcomes, summary }
    }
}

fn next_target(queue: &Mutex<VecDeque<Target>>) -> Option<Target> {
    // A poisoned queue still holds valid targets.
    let mut guard = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.pop_front()
}

/// Runs the pipeline on its own task so a panic only fails this target.
async fn run_isolated(pipeline: Arc<ExtractionPipeline>, target: Target) -> ExtractionOutcome {
    let task_target = target.clone();
    match tokio::spawn(async move { pipeline.run(task_target).await }).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let message = if err.is_panic() {
                panic_message(err.into_panic().as_ref())
            } else {
                err.to_string()
            };
            ExtractionOutcome::failure(target, ErrorRecord::panicked(message), 1)
        }
    }
}
