#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrape_core::PipelineConfig;
use scrape_engine::{EventSink, PipelineEvent, RenderError, RenderSession, Renderer, Sleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    FailTimes(u32),
    AlwaysFail,
    Panic,
    Hang,
    Empty,
}

#[derive(Debug, Default)]
pub struct RenderStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    calls: Mutex<HashMap<String, u32>>,
}

impl RenderStats {
    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Renderer whose per-URL behaviour is scripted up front.
#[derive(Clone, Default)]
pub struct ScriptedRenderer {
    behaviours: Arc<HashMap<String, Behaviour>>,
    delays: Arc<HashMap<String, Duration>>,
    default_delay: Duration,
    body_prefix: String,
    pub stats: Arc<RenderStats>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self {
            body_prefix: "Body of".to_string(),
            ..Self::default()
        }
    }

    pub fn with(mut self, url: &str, behaviour: Behaviour) -> Self {
        Arc::make_mut(&mut self.behaviours).insert(url.to_string(), behaviour);
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(url.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_body_prefix(mut self, prefix: &str) -> Self {
        self.body_prefix = prefix.to_string();
        self
    }

    pub fn page_for(prefix: &str, url: &str) -> String {
        format!(
            "<html><head><title>{url}</title></head><body>\
             <nav>Site menu</nav>\
             <article><h1>Heading</h1><p>{prefix} {url}</p></article>\
             <footer>Copyright footer</footer>\
             </body></html>"
        )
    }
}

#[async_trait::async_trait]
impl Renderer for ScriptedRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            renderer: self.clone(),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    renderer: ScriptedRenderer,
    closed: bool,
}

#[async_trait::async_trait]
impl RenderSession for ScriptedSession {
    async fn render(
        &mut self,
        url: &str,
        _page_load_timeout: Duration,
    ) -> Result<Option<String>, RenderError> {
        let call = {
            let mut calls = self.renderer.stats.calls.lock().unwrap();
            let entry = calls.entry(url.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let delay = self
            .renderer
            .delays
            .get(url)
            .copied()
            .unwrap_or(self.renderer.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let behaviour = self
            .renderer
            .behaviours
            .get(url)
            .copied()
            .unwrap_or(Behaviour::Succeed);
        match behaviour {
            Behaviour::Succeed => Ok(Some(ScriptedRenderer::page_for(
                &self.renderer.body_prefix,
                url,
            ))),
            Behaviour::FailTimes(n) if call <= n => {
                Err(RenderError::Navigation(format!("scripted failure {call}")))
            }
            Behaviour::FailTimes(_) => Ok(Some(ScriptedRenderer::page_for(
                &self.renderer.body_prefix,
                url,
            ))),
            Behaviour::AlwaysFail => Err(RenderError::Driver(format!("scripted failure {call}"))),
            Behaviour::Panic => panic!("renderer blew up"),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
            Behaviour::Empty => Ok(Some("   ".to_string())),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.renderer.stats.closed.fetch_add(1, Ordering::SeqCst);
            self.renderer.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Records backoff delays instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn config(output_dir: &Path, max_retries: u32) -> PipelineConfig {
    PipelineConfig {
        max_retries,
        backoff_base: Duration::from_millis(100),
        page_load_timeout: Duration::from_secs(5),
        output_directory: output_dir.to_path_buf(),
    }
}
