use std::time::Duration;

use scrape_core::ErrorRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("page load timed out after {0:?}")]
    Timeout(Duration),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("renderer returned no markup")]
    EmptyPage,
    #[error("failed to decode page with {encoding}")]
    Decode { encoding: String },
    #[error("navigation error: {0}")]
    Navigation(String),
    #[error("driver error: {0}")]
    Driver(String),
    #[error("renderer panicked: {0}")]
    Panicked(String),
}

impl From<RenderError> for ErrorRecord {
    fn from(err: RenderError) -> Self {
        ErrorRecord::render(err.to_string())
    }
}

/// Produces rendering sessions. One session is opened per attempt.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// A stateful rendering resource (browser, HTTP client) owned by one attempt.
///
/// `close` must be called once the attempt is done with the session, whatever
/// the outcome of `render`.
#[async_trait::async_trait]
pub trait RenderSession: Send {
    /// Returns the post-render markup of `url`, or `None` when the page had none.
    async fn render(
        &mut self,
        url: &str,
        page_load_timeout: Duration,
    ) -> Result<Option<String>, RenderError>;

    async fn close(&mut self);
}
