use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::http_render::DESKTOP_USER_AGENT;
use crate::render::{RenderError, RenderSession, Renderer};

const READY_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ChromeRenderSettings {
    pub window_size: (u32, u32),
    pub user_agent: String,
    /// Extra wait after navigation so client-side scripts can fill the page.
    pub settle_delay: Duration,
    /// Chrome binary; chromiumoxide searches the usual locations when unset.
    pub executable: Option<PathBuf>,
}

impl Default for ChromeRenderSettings {
    fn default() -> Self {
        Self {
            window_size: (1920, 1080),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            settle_delay: Duration::from_secs(2),
            executable: None,
        }
    }
}

/// Headless Chrome renderer. Every session launches and later shuts down its
/// own browser process.
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    settings: ChromeRenderSettings,
}

impl ChromeRenderer {
    pub fn new(settings: ChromeRenderSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Renderer for ChromeRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let (width, height) = self.settings.window_size;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.settings.user_agent));
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(RenderError::Driver)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| RenderError::Driver(err.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            handler: Some(handler),
            settle_delay: self.settings.settle_delay,
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    settle_delay: Duration,
}

#[async_trait::async_trait]
impl RenderSession for ChromeSession {
    async fn render(
        &mut self,
        url: &str,
        page_load_timeout: Duration,
    ) -> Result<Option<String>, RenderError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| RenderError::Driver("browser already closed".into()))?;

        let page = browser
            .new_page(url)
            .await
            .map_err(|err| RenderError::Navigation(err.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|err| RenderError::Navigation(err.to_string()))?;
        tokio::time::timeout(page_load_timeout, wait_until_complete(&page))
            .await
            .map_err(|_| RenderError::Timeout(page_load_timeout))??;
        tokio::time::sleep(self.settle_delay).await;

        let html = page
            .content()
            .await
            .map_err(|err| RenderError::Driver(err.to_string()))?;
        engine_debug!("Rendered {} bytes from {}", html.len(), url);
        if let Err(err) = page.close().await {
            engine_warn!("Failed to close page for {}: {}", url, err);
        }
        Ok(Some(html))
    }

    async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                engine_warn!("Failed to close browser: {}", err);
            }
            let _ = browser.wait().await;
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// Polls `document.readyState` until the page reports `complete`.
async fn wait_until_complete(page: &Page) -> Result<(), RenderError> {
    loop {
        let state: String = page
            .evaluate("document.readyState")
            .await
            .map_err(|err| RenderError::Driver(err.to_string()))?
            .into_value()
            .map_err(|err| RenderError::Driver(err.to_string()))?;
        if state == "complete" {
            return Ok(());
        }
        tokio::time::sleep(READY_POLL).await;
    }
}
