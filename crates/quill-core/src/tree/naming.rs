//! Entry naming: `{order}-{slug}` with a zero-padded order numeral.

use std::sync::LazyLock;

use regex::Regex;

static ORDER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-").expect("order prefix pattern"));

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern"));

/// Maximum slug length in bytes (slugs are ASCII).
pub const SLUG_MAX_LEN: usize = 30;

/// Order prefix used when an entry has none.
pub const DEFAULT_ORDER: &str = "001";

/// Slug used when a title has no ASCII letters or digits.
pub const EMPTY_SLUG: &str = "untitled";

pub const PAGE_EXTENSION: &str = ".md";

/// Lowercase `title`, collapse every run outside `[a-z0-9]` into `-`, and
/// truncate to [`SLUG_MAX_LEN`].
///
/// Leading and trailing dashes are kept the way the replacement leaves them,
/// so `"  Hello"` becomes `"-hello"`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = NON_SLUG.replace_all(&lowered, "-").into_owned();
    slug.truncate(SLUG_MAX_LEN);
    if slug.is_empty() || slug.chars().all(|c| c == '-') {
        return EMPTY_SLUG.to_string();
    }
    slug
}

/// Format an order number as a three digit numeral (`7` -> `"007"`).
pub fn format_order(n: u32) -> String {
    format!("{n:03}")
}

/// The leading `NNN` of `NNN-rest`, if present.
pub fn order_prefix(name: &str) -> Option<&str> {
    ORDER_PREFIX
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Numeric value of the leading digits of `name`; 0 when there are none.
pub fn order_number(name: &str) -> u32 {
    let digits: &str = {
        let end = name
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(name.len());
        &name[..end]
    };
    digits.parse().unwrap_or(0)
}

/// Next free order number among `siblings`: one past the largest.
pub fn next_order(siblings: &[String]) -> u32 {
    siblings.iter().map(|n| order_number(n)).max().unwrap_or(0) + 1
}

/// Drop a leading `NNN-` from `name`.
pub fn strip_order(name: &str) -> &str {
    match ORDER_PREFIX.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Directory or file name for an entry with the given order and title.
pub fn entry_name(order: &str, title: &str, is_page: bool) -> String {
    let ext = if is_page { PAGE_EXTENSION } else { "" };
    format!("{order}-{}{ext}", slugify(title))
}

/// Human title derived from an entry name: order prefix and `.md` removed,
/// dashes turned into spaces.
pub fn title_from_name(name: &str) -> String {
    let base = name.strip_suffix(PAGE_EXTENSION).unwrap_or(name);
    strip_order(base).replace('-', " ")
}

pub fn is_page_file(name: &str) -> bool {
    name.ends_with(PAGE_EXTENSION)
}

/// Sort entry names by numeric order prefix, then by name.
pub fn sort_by_order(names: &mut [String]) {
    names.sort_by(|a, b| {
        order_number(a)
            .cmp(&order_number(b))
            .then_with(|| a.cmp(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_truncates() {
        assert_eq!(slugify("Getting Started!"), "getting-started-");
        assert_eq!(slugify("A  --  B"), "a-b");
        assert_eq!(slugify("Ünïcode Title"), "-n-code-title");
        let long = slugify("An extremely long chapter title that keeps going");
        assert_eq!(long.len(), SLUG_MAX_LEN);
        assert_eq!(long, "an-extremely-long-chapter-titl");
    }

    #[test]
    fn slugify_falls_back_for_symbol_only_titles() {
        assert_eq!(slugify("!!!"), EMPTY_SLUG);
        assert_eq!(slugify(""), EMPTY_SLUG);
    }

    #[test]
    fn order_parsing() {
        assert_eq!(order_prefix("012-intro"), Some("012"));
        assert_eq!(order_prefix("intro"), None);
        assert_eq!(order_number("012-intro"), 12);
        assert_eq!(order_number("notes"), 0);
        assert_eq!(next_order(&["001-a".into(), "007-b".into()]), 8);
        assert_eq!(next_order(&[]), 1);
        assert_eq!(format_order(8), "008");
        assert_eq!(format_order(1234), "1234");
    }

    #[test]
    fn titles_from_names() {
        assert_eq!(title_from_name("003-first-run.md"), "first run");
        assert_eq!(title_from_name("001-getting-started"), "getting started");
        assert_eq!(title_from_name("loose-notes"), "loose notes");
    }

    #[test]
    fn entry_names() {
        assert_eq!(entry_name("002", "Setup Guide", false), "002-setup-guide");
        assert_eq!(entry_name("010", "Setup Guide", true), "010-setup-guide.md");
    }

    #[test]
    fn sorting_is_numeric() {
        let mut names: Vec<String> = ["10-j", "2-b", "002-a", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_by_order(&mut names);
        assert_eq!(names, vec!["x", "002-a", "2-b", "10-j"]);
    }
}
