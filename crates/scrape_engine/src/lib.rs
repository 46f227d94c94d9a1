//! Scrape engine: rendering, content selection, conversion, persistence and
//! the retrying pipeline with its concurrent orchestrator.
mod convert;
mod decode;
mod events;
mod http_render;
mod orchestrator;
mod persist;
mod pipeline;
mod render;
mod select;

#[cfg(feature = "chrome")]
mod chrome_render;

pub use convert::{
    convert_or_fallback, plain_text, Conversion, Converter, HeadingStyle, Html2MdConverter,
    MarkdownStyle,
};
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use events::{ChannelEventSink, EventSink, LogEventSink, PipelineEvent};
pub use http_render::{HttpRenderSettings, HttpRenderer, DESKTOP_USER_AGENT};
pub use orchestrator::{Orchestrator, RunReport};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{ExtractionPipeline, Sleeper, TokioSleeper};
pub use render::{RenderError, RenderSession, Renderer};
pub use select::{ContentSelector, DenylistSelector, SelectorRules};

#[cfg(feature = "chrome")]
pub use chrome_render::{ChromeRenderSettings, ChromeRenderer};
