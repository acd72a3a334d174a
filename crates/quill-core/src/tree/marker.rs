//! Title marker: the optional first line of a page file.
//!
//! `<!-- title: Module Title > Chapter Title > Page Title -->`
//!
//! Parts are separated by `" > "`. Missing or blank parts fall back to
//! titles derived from entry names.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!--[ \t]*title:[ \t]*(.+?)[ \t]*-->(?:\r?\n)?").expect("title marker pattern")
});

const SEPARATOR: &str = " > ";

/// Module, chapter and page titles for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleTriple {
    pub module: String,
    pub chapter: String,
    pub page: String,
}

impl TitleTriple {
    pub fn new(
        module: impl Into<String>,
        chapter: impl Into<String>,
        page: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            chapter: chapter.into(),
            page: page.into(),
        }
    }

    /// Render as a marker line, newline included.
    pub fn to_marker(&self) -> String {
        format!(
            "<!-- title: {}{SEPARATOR}{}{SEPARATOR}{} -->\n",
            self.module, self.chapter, self.page
        )
    }
}

/// Split a raw page file into its marker titles (if any) and body.
///
/// Each marker part that is absent or blank is taken from `fallback`.
pub fn split<'a>(raw: &'a str, fallback: &TitleTriple) -> (TitleTriple, &'a str) {
    let Some(caps) = MARKER.captures(raw) else {
        return (fallback.clone(), raw);
    };
    let end = caps.get(0).map_or(0, |m| m.end());
    let inner = caps.get(1).map_or("", |m| m.as_str());

    let mut parts = inner.split(SEPARATOR).map(str::trim);
    let mut pick = |default: &str| match parts.next() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => default.to_string(),
    };
    let titles = TitleTriple {
        module: pick(&fallback.module),
        chapter: pick(&fallback.chapter),
        page: pick(&fallback.page),
    };
    (titles, &raw[end..])
}

/// Page body with any leading marker removed.
pub fn strip(raw: &str) -> &str {
    match MARKER.find(raw) {
        Some(m) => &raw[m.end()..],
        None => raw,
    }
}

pub fn has_marker(raw: &str) -> bool {
    MARKER.is_match(raw)
}

/// `body` prefixed with a marker for `titles`.
pub fn with_marker(titles: &TitleTriple, body: &str) -> String {
    let mut out = titles.to_marker();
    out.push_str(body);
    out
}
