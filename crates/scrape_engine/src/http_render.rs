use std::time::Duration;

use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::decode::decode_page;
use crate::render::{RenderError, RenderSession, Renderer};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpRenderSettings {
    pub connect_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl Default for HttpRenderSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

/// Static renderer: returns the markup served for a URL without running scripts.
#[derive(Debug, Clone, Default)]
pub struct HttpRenderer {
    settings: HttpRenderSettings,
}

impl HttpRenderer {
    pub fn new(settings: HttpRenderSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Renderer for HttpRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.settings.redirect_limit))
            .build()
            .map_err(|err| RenderError::Driver(err.to_string()))?;
        Ok(Box::new(HttpSession {
            client: Some(client),
            settings: self.settings.clone(),
        }))
    }
}

struct HttpSession {
    client: Option<reqwest::Client>,
    settings: HttpRenderSettings,
}

impl HttpSession {
    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    fn too_large(&self, actual: u64) -> RenderError {
        RenderError::TooLarge {
            max_bytes: self.settings.max_bytes,
            actual: Some(actual),
        }
    }
}

#[async_trait::async_trait]
impl RenderSession for HttpSession {
    async fn render(
        &mut self,
        url: &str,
        page_load_timeout: Duration,
    ) -> Result<Option<String>, RenderError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| RenderError::Driver("session already closed".into()))?;
        let parsed =
            reqwest::Url::parse(url).map_err(|err| RenderError::InvalidUrl(err.to_string()))?;

        let response = client
            .get(parsed)
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .timeout(page_load_timeout)
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, page_load_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus(status.as_u16()));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(RenderError::UnsupportedContentType(ct.to_string()));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(err, page_load_timeout))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Ok(None);
        }
        let decoded = decode_page(&bytes, content_type.as_deref())?;
        engine_debug!(
            "Fetched {} bytes from {} ({})",
            bytes.len(),
            url,
            decoded.encoding_label
        );
        Ok(Some(decoded.html))
    }

    async fn close(&mut self) {
        // Dropping the client releases its connection pool.
        self.client = None;
    }
}

fn map_reqwest_error(err: reqwest::Error, page_load_timeout: Duration) -> RenderError {
    if err.is_timeout() {
        return RenderError::Timeout(page_load_timeout);
    }
    if err.is_redirect() {
        return RenderError::Navigation(format!("redirect limit exceeded: {err}"));
    }
    RenderError::Navigation(err.to_string())
}
