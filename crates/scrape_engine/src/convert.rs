use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::{Captures, Regex};
use scraper::{Html, Selector};

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector is valid"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[*+-] ").expect("list item pattern is valid"));

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// Whatever the underlying converter emits (underlined `===`/`---` for h1/h2).
    Setext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownStyle {
    pub heading: HeadingStyle,
    pub bullet: char,
    /// Unwrap `<a>` elements before conversion so only their content remains.
    pub strip_links: bool,
}

impl Default for MarkdownStyle {
    fn default() -> Self {
        Self {
            heading: HeadingStyle::Atx,
            bullet: '-',
            strip_links: true,
        }
    }
}

impl MarkdownStyle {
    /// Rewrite converter output to this style, dropping trailing whitespace per
    /// line and blank lines around the document. Fenced code is left as is.
    pub fn apply(&self, markdown: &str) -> String {
        let lines: Vec<&str> = markdown.lines().map(str::trim_end).collect();
        let mut out: Vec<String> = Vec::with_capacity(lines.len());

        let mut fence: Option<&str> = None;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if let Some(open) = fence {
                if is_fence(line) == Some(open) {
                    fence = None;
                }
                out.push(line.to_string());
                i += 1;
                continue;
            }
            if let Some(marker) = is_fence(line) {
                fence = Some(marker);
                out.push(line.to_string());
                i += 1;
                continue;
            }
            if self.heading == HeadingStyle::Atx {
                if let Some(level) = lines.get(i + 1).and_then(|next| setext_level(line, next)) {
                    out.push(format!("{} {}", "#".repeat(level), line.trim()));
                    i += 2;
                    continue;
                }
            }
            out.push(self.restyle_bullet(line));
            i += 1;
        }

        out.join("\n").trim().to_string()
    }

    fn restyle_bullet(&self, line: &str) -> String {
        if is_thematic_break(line) {
            return line.to_string();
        }
        let bullet = self.bullet;
        LIST_ITEM
            .replace(line, |caps: &Captures| format!("{}{bullet} ", &caps[1]))
            .into_owned()
    }
}

fn setext_level(line: &str, underline: &str) -> Option<usize> {
    let text = line.trim();
    let marks = underline.trim();
    if text.is_empty() || marks.is_empty() || LIST_ITEM.is_match(line) {
        return None;
    }
    if marks.chars().all(|c| c == '=') {
        Some(1)
    } else if marks.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn is_thematic_break(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['*', '-', '_']
            .iter()
            .any(|mark| compact.chars().all(|c| c == *mark))
}

fn is_fence(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Replaces every `<a>` with its children, so link text and linked images stay
/// and hrefs disappear.
fn unwrap_links(html: &str) -> String {
    let mut doc = Html::parse_document(html);
    let anchors: Vec<NodeId> = doc.root_element().select(&ANCHOR).map(|el| el.id()).collect();
    for anchor in anchors {
        let children: Vec<NodeId> = match doc.tree.get(anchor) {
            Some(node) => node.children().map(|child| child.id()).collect(),
            None => continue,
        };
        if let Some(mut node) = doc.tree.get_mut(anchor) {
            for child in children {
                node.insert_id_before(child);
            }
            node.detach();
        }
    }
    doc.root_element().html()
}

/// `html2md` with the fixed output style applied on top.
#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter {
    pub style: MarkdownStyle,
}

impl Html2MdConverter {
    pub fn new(style: MarkdownStyle) -> Self {
        Self { style }
    }
}

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        let markdown = if self.style.strip_links {
            html2md::parse_html(&unwrap_links(html))
        } else {
            html2md::parse_html(html)
        };
        self.style.apply(&markdown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub markdown: String,
    /// Set when the converter failed and the plain-text fallback was used.
    pub fallback_reason: Option<String>,
}

/// Runs the converter, degrading to the region's plain text if it panics.
pub fn convert_or_fallback(converter: &dyn Converter, html: &str) -> Conversion {
    match panic::catch_unwind(AssertUnwindSafe(|| converter.to_markdown(html))) {
        Ok(markdown) => Conversion {
            markdown,
            fallback_reason: None,
        },
        Err(payload) => Conversion {
            markdown: plain_text(html),
            fallback_reason: Some(panic_message(payload.as_ref())),
        },
    }
}

/// Visible text of an HTML fragment, one trimmed text run per line.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
