use ego_tree::NodeId;
use scraper::{Html, Selector};

/// Isolates the main content region of a rendered page.
pub trait ContentSelector: Send + Sync {
    /// Returns the outer HTML of the best content region. Never fails.
    fn select(&self, raw_markup: &str) -> String;
}

/// CSS selectors driving `DenylistSelector`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorRules {
    /// Removed from the document before any content lookup.
    pub denylist: Vec<String>,
    /// Tried in order; the first match is the content region.
    pub priority: Vec<String>,
}

impl Default for SelectorRules {
    fn default() -> Self {
        let denylist = [
            "nav",
            "footer",
            "header",
            "aside",
            "script",
            "style",
            "iframe",
            "noscript",
            ".ad",
            ".advertisement",
            "#ads",
            "[role='navigation']",
            "[role='banner']",
            "[role='complementary']",
            "[aria-label='Advertisement']",
        ];
        let priority = [
            "main",
            "article",
            "div.content",
            "div#content",
            "[role='main']",
        ];
        Self {
            denylist: denylist.iter().map(|s| s.to_string()).collect(),
            priority: priority.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Strips chrome (navigation, headers, footers, scripts, ads) and then picks
/// the first semantic content container, falling back to `<body>` and finally
/// to the whole cleaned document.
#[derive(Debug)]
pub struct DenylistSelector {
    denylist: Vec<Selector>,
    priority: Vec<Selector>,
    body: Option<Selector>,
}

impl DenylistSelector {
    /// Rules that fail to parse as CSS are skipped.
    pub fn new(rules: &SelectorRules) -> Self {
        Self {
            denylist: parse_all(&rules.denylist),
            priority: parse_all(&rules.priority),
            body: Selector::parse("body").ok(),
        }
    }

    fn strip_denylisted(&self, doc: &mut Html) {
        let doomed: Vec<NodeId> = self
            .denylist
            .iter()
            .flat_map(|sel| {
                doc.root_element()
                    .select(sel)
                    .map(|el| el.id())
                    .collect::<Vec<_>>()
            })
            .collect();
        for id in doomed {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

impl Default for DenylistSelector {
    fn default() -> Self {
        Self::new(&SelectorRules::default())
    }
}

impl ContentSelector for DenylistSelector {
    fn select(&self, raw_markup: &str) -> String {
        let mut doc = Html::parse_document(raw_markup);
        self.strip_denylisted(&mut doc);

        // Walk from the root so nodes inside detached subtrees are never matched.
        let root = doc.root_element();
        self.priority
            .iter()
            .chain(self.body.iter())
            .find_map(|sel| root.select(sel).next())
            .map(|el| el.html())
            .unwrap_or_else(|| root.html())
    }
}

fn parse_all(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}
