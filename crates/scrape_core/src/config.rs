use std::path::PathBuf;
use std::time::Duration;

use crate::checked_backoff_delay;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_retries must be at least 1")]
    NoAttempts,
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidSeconds { field: &'static str, value: f64 },
    #[error("backoff before attempt {attempt} exceeds the longest representable delay")]
    BackoffOverflow { attempt: u32 },
}

/// Process-wide pipeline settings, read-only once a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Total attempts per target, including the first one.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub page_load_timeout: Duration,
    pub output_directory: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            page_load_timeout: Duration::from_secs(30),
            output_directory: PathBuf::from("./output"),
        }
    }
}

impl PipelineConfig {
    /// Build a validated config from second-based values as found in config files.
    pub fn from_seconds(
        max_retries: u32,
        backoff_base_seconds: f64,
        page_load_timeout_seconds: f64,
        output_directory: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_retries,
            backoff_base: seconds("backoff_base_seconds", backoff_base_seconds)?,
            page_load_timeout: seconds("page_load_timeout_seconds", page_load_timeout_seconds)?,
            output_directory: output_directory.into(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::NoAttempts);
        }
        // The last sleep precedes attempt `max_retries`.
        let last_failed = self.max_retries - 1;
        if last_failed > 0 && checked_backoff_delay(self.backoff_base, last_failed).is_none() {
            return Err(ConfigError::BackoffOverflow {
                attempt: self.max_retries,
            });
        }
        Ok(())
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidSeconds { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.page_load_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_seconds_accepts_fractions() {
        let config = PipelineConfig::from_seconds(2, 0.5, 12.0, "out").unwrap();
        assert_eq!(config.backoff_base, Duration::from_millis(500));
        assert_eq!(config.page_load_timeout, Duration::from_secs(12));
        assert_eq!(config.output_directory, PathBuf::from("out"));
    }

    #[test]
    fn zero_retries_rejected() {
        let err = PipelineConfig::from_seconds(0, 1.0, 30.0, "out").unwrap_err();
        assert_eq!(err, ConfigError::NoAttempts);
    }

    #[test]
    fn backoff_that_cannot_grow_is_rejected() {
        assert!(PipelineConfig::from_seconds(64, 1.0, 30.0, "out").is_ok());
        let err = PipelineConfig::from_seconds(100, 1.0, 30.0, "out").unwrap_err();
        assert_eq!(err, ConfigError::BackoffOverflow { attempt: 100 });
    }

    #[test]
    fn negative_seconds_rejected() {
        let err = PipelineConfig::from_seconds(3, -1.0, 30.0, "out").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSeconds {
                field: "backoff_base_seconds",
                ..
            }
        ));
        assert!(PipelineConfig::from_seconds(3, 1.0, f64::NAN, "out").is_err());
    }
}
