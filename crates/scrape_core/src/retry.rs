use std::time::Duration;

use crate::{ErrorRecord, PipelineConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Attempting { attempt: u32 },
    Retrying { next_attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32, error: ErrorRecord },
}

impl PipelineState {
    pub fn initial() -> Self {
        PipelineState::Attempting { attempt: 1 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Succeeded { .. } | PipelineState::Exhausted { .. }
        )
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptMsg {
    /// The attempt got through rendering, conversion and saving.
    Succeeded,
    /// The attempt hit a recoverable failure.
    Failed(ErrorRecord),
    /// The backoff sleep requested by `Effect::Sleep` is over.
    BackoffElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Sleep(Duration),
}

/// Delay before the attempt following failed attempt `attempt`: `base * 2^(attempt-1)`.
/// Saturates at `Duration::MAX`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    checked_backoff_delay(base, attempt).unwrap_or(Duration::MAX)
}

/// Like [`backoff_delay`], but `None` once the delay no longer fits in a `Duration`.
pub fn checked_backoff_delay(base: Duration, attempt: u32) -> Option<Duration> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let factor = 1u128.checked_shl(attempt.saturating_sub(1))?;
    let nanos = base.as_nanos().checked_mul(factor)?;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
}

/// Pure update function: applies an attempt message to the state and returns any effect.
///
/// Messages that do not apply to the current state leave it unchanged.
pub fn update(
    state: PipelineState,
    msg: AttemptMsg,
    config: &PipelineConfig,
) -> (PipelineState, Option<Effect>) {
    match (state, msg) {
        (PipelineState::Attempting { attempt }, AttemptMsg::Succeeded) => {
            (PipelineState::Succeeded { attempts: attempt }, None)
        }
        (PipelineState::Attempting { attempt }, AttemptMsg::Failed(error)) => {
            if attempt < config.max_retries {
                let delay = backoff_delay(config.backoff_base, attempt);
                (
                    PipelineState::Retrying {
                        next_attempt: attempt + 1,
                        delay,
                    },
                    Some(Effect::Sleep(delay)),
                )
            } else {
                (
                    PipelineState::Exhausted {
                        attempts: attempt,
                        error,
                    },
                    None,
                )
            }
        }
        (PipelineState::Retrying { next_attempt, .. }, AttemptMsg::BackoffElapsed) => (
            PipelineState::Attempting {
                attempt: next_attempt,
            },
            None,
        ),
        (state, _) => (state, None),
    }
}
