//! Run configuration, read once from a RON file at startup.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use engine_logging::LogDestination;
use log::LevelFilter;
use scrape_core::{ConfigError, PipelineConfig, Target};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "./config/targets.ron";
const LOG_FILE: &str = "./engine.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RendererKind {
    /// Plain HTTP fetch; no scripts run.
    #[default]
    Http,
    /// Headless Chrome; needs the `chrome` feature.
    Chrome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LogTarget {
    #[default]
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub output_directory: PathBuf,
    pub max_retries: u32,
    pub backoff_base_seconds: f64,
    pub page_load_timeout_seconds: f64,
    pub max_workers: usize,
    pub renderer: RendererKind,
    pub log: LogTarget,
    pub log_level: String,
    pub targets: Vec<TargetEntry>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            output_directory: pipeline.output_directory,
            max_retries: pipeline.max_retries,
            backoff_base_seconds: pipeline.backoff_base.as_secs_f64(),
            page_load_timeout_seconds: pipeline.page_load_timeout.as_secs_f64(),
            max_workers: 3,
            renderer: RendererKind::default(),
            log: LogTarget::default(),
            log_level: "info".to_string(),
            targets: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: RunConfig = ron::from_str(text)?;
        Ok(config)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        PipelineConfig::from_seconds(
            self.max_retries,
            self.backoff_base_seconds,
            self.page_load_timeout_seconds,
            self.output_directory.clone(),
        )
    }

    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|entry| Target::new(entry.url.clone(), entry.title.clone()))
            .collect()
    }

    /// Titles that appear more than once; their files overwrite each other.
    pub fn duplicate_titles(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for entry in &self.targets {
            if !seen.insert(entry.title.as_str()) && !duplicates.contains(&entry.title) {
                duplicates.push(entry.title.clone());
            }
        }
        duplicates
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(PathBuf::from(LOG_FILE)),
            LogTarget::Both => LogDestination::Both(PathBuf::from(LOG_FILE)),
        }
    }

    pub fn log_level(&self) -> anyhow::Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow::anyhow!("unknown log_level {:?}", self.log_level))
    }
}
