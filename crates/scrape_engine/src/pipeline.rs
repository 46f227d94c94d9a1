use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use scrape_core::{
    update, AttemptMsg, Effect, ErrorRecord, ExtractionOutcome, PipelineConfig, PipelineState,
    Target,
};

use crate::convert::{convert_or_fallback, panic_message, Converter, Html2MdConverter};
use crate::events::{EventSink, LogEventSink, PipelineEvent};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::render::{RenderError, Renderer};
use crate::select::{ContentSelector, DenylistSelector};

/// Waits out backoff delays between attempts.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Render -> select -> convert -> save for one target, retried with
/// exponential backoff until it succeeds or `max_retries` attempts are spent.
///
/// Every attempt opens its own renderer session and carries nothing over
/// from earlier attempts.
#[derive(Clone)]
pub struct ExtractionPipeline {
    config: Arc<PipelineConfig>,
    renderer: Arc<dyn Renderer>,
    selector: Arc<dyn ContentSelector>,
    converter: Arc<dyn Converter>,
    sleeper: Arc<dyn Sleeper>,
    sink: Arc<dyn EventSink>,
}

impl ExtractionPipeline {
    pub fn new(config: Arc<PipelineConfig>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config,
            renderer,
            selector: Arc::new(DenylistSelector::default()),
            converter: Arc::new(Html2MdConverter::default()),
            sleeper: Arc::new(TokioSleeper),
            sink: Arc::new(LogEventSink),
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn ContentSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub(crate) fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub async fn run(&self, target: Target) -> ExtractionOutcome {
        let mut state = PipelineState::initial();
        let mut saved: Option<(String, PathBuf)> = None;

        while !state.is_terminal() {
            let msg = match &state {
                PipelineState::Attempting { attempt } => {
                    match self.attempt(&target, *attempt).await {
                        Ok(done) => {
                            saved = Some(done);
                            AttemptMsg::Succeeded
                        }
                        Err(error) => {
                            self.sink.emit(PipelineEvent::AttemptFailed {
                                title: target.title.clone(),
                                attempt: *attempt,
                                max_retries: self.config.max_retries,
                                error: error.clone(),
                            });
                            AttemptMsg::Failed(error)
                        }
                    }
                }
                // Only reached once the sleep effect below has run.
                PipelineState::Retrying { .. } => AttemptMsg::BackoffElapsed,
                PipelineState::Succeeded { .. } | PipelineState::Exhausted { .. } => break,
            };

            let (next, effect) = update(state, msg, &self.config);
            if let Some(Effect::Sleep(delay)) = effect {
                if let PipelineState::Retrying { next_attempt, .. } = &next {
                    self.sink.emit(PipelineEvent::BackoffScheduled {
                        title: target.title.clone(),
                        next_attempt: *next_attempt,
                        delay,
                    });
                }
                self.sleeper.sleep(delay).await;
            }
            state = next;
        }

        match (state, saved) {
            (PipelineState::Succeeded { attempts }, Some((content, path))) => {
                ExtractionOutcome::success(target, content, path, attempts)
            }
            (PipelineState::Exhausted { attempts, error }, _) => {
                self.sink.emit(PipelineEvent::Exhausted {
                    title: target.title.clone(),
                    attempts,
                    error: error.clone(),
                });
                ExtractionOutcome::failure(target, error, attempts)
            }
            (state, _) => ExtractionOutcome::failure(
                target,
                ErrorRecord::panicked(format!("pipeline stopped in state {state:?}")),
                1,
            ),
        }
    }

    async fn attempt(
        &self,
        target: &Target,
        attempt: u32,
    ) -> Result<(String, PathBuf), ErrorRecord> {
        self.sink.emit(PipelineEvent::AttemptStarted {
            title: target.title.clone(),
            url: target.url.clone(),
            attempt,
        });

        let html = self.render(&target.url).await?;
        let region = self.selector.select(&html);
        let conversion = convert_or_fallback(self.converter.as_ref(), &region);
        if let Some(reason) = conversion.fallback_reason {
            self.sink.emit(PipelineEvent::ConverterFallback {
                title: target.title.clone(),
                attempt,
                reason,
            });
        }

        let path = self.save(target, &conversion.markdown).await?;
        self.sink.emit(PipelineEvent::Saved {
            title: target.title.clone(),
            path: path.clone(),
            chars: conversion.markdown.chars().count(),
        });
        Ok((conversion.markdown, path))
    }

    /// One renderer session, closed on every path out of here.
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let mut session = self.renderer.open_session().await?;
        let timeout = self.config.page_load_timeout;

        let load = tokio::time::timeout(timeout, session.render(url, timeout));
        let rendered = AssertUnwindSafe(load).catch_unwind().await;
        session.close().await;

        match rendered {
            Ok(Ok(Ok(Some(html)))) if !html.trim().is_empty() => Ok(html),
            Ok(Ok(Ok(_))) => Err(RenderError::EmptyPage),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_elapsed)) => Err(RenderError::Timeout(timeout)),
            Err(payload) => Err(RenderError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    async fn save(&self, target: &Target, markdown: &str) -> Result<PathBuf, PersistError> {
        let writer = AtomicFileWriter::new(self.config.output_directory.clone());
        let file_name = target.file_name();
        let content = markdown.to_string();
        tokio::task::spawn_blocking(move || writer.write(&file_name, &content))
            .await
            .map_err(|err| PersistError::Task(err.to_string()))?
    }
}
