use std::fmt;

/// One page to extract. `title` is used verbatim as the output file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub url: String,
    pub title: String,
}

impl Target {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// File name of the saved document, `{title}.md`.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.title)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.url)
    }
}
