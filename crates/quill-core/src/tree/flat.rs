//! Flat text import and export.
//!
//! A whole content tree as one document:
//!
//! ```text
//! === Module Title ===
//! --- Chapter Title ---
//! +++ Page Title +++
//! page body lines...
//! ```

use std::fs;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use super::marker::TitleTriple;
use super::model::Module;
use super::naming::{entry_name, format_order, next_order};
use super::{ContentTree, NodeKind, TreeError, list_entries};

static MODULE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^===\s*(.+?)\s*===\s*$").expect("module delimiter pattern"));

static CHAPTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---\s*(.+?)\s*---\s*$").expect("chapter delimiter pattern"));

static PAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+\+\+\s*(.+?)\s*\+\+\+\s*$").expect("page delimiter pattern")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatPage {
    pub title: String,
    /// Body lines joined with `\n`, untrimmed.
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatChapter {
    pub title: String,
    pub pages: Vec<FlatPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatModule {
    pub title: String,
    pub chapters: Vec<FlatChapter>,
}

/// Result of scanning a flat document, including what had nowhere to go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatOutline {
    pub modules: Vec<FlatModule>,
    /// Non-blank lines outside any page, not counting lines under an
    /// orphaned delimiter.
    pub dropped_lines: usize,
    /// Page delimiters seen while no chapter was open.
    pub orphaned_pages: usize,
    /// Chapter delimiters seen while no module was open.
    pub orphaned_chapters: usize,
}

/// Counts reported by [`ContentTree::import_flat`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub modules: usize,
    pub chapters: usize,
    pub pages: usize,
    pub dropped_lines: usize,
    pub orphaned_pages: usize,
    pub orphaned_chapters: usize,
}

/// Scan a flat document into modules, chapters and pages.
///
/// Line endings are normalised to `\n`. A page delimiter with no open
/// chapter, or a chapter delimiter with no open module, is counted and its
/// content discarded up to the next delimiter that has a home.
pub fn parse_flat(document: &str) -> FlatOutline {
    let normalized = document.replace("\r\n", "\n");
    let mut outline = FlatOutline::default();

    // Where body lines currently go.
    #[derive(PartialEq)]
    enum Sink {
        Nowhere,
        Discard,
        Page,
    }
    let mut sink = Sink::Nowhere;
    let mut body: Vec<&str> = Vec::new();

    let flush = |outline: &mut FlatOutline, body: &mut Vec<&str>, sink: &Sink| {
        if *sink == Sink::Page {
            if let Some(page) = outline
                .modules
                .last_mut()
                .and_then(|m| m.chapters.last_mut())
                .and_then(|c| c.pages.last_mut())
            {
                page.body = body.join("\n");
            }
        }
        body.clear();
    };

    for line in normalized.split('\n') {
        if let Some(title) = capture(&MODULE_LINE, line) {
            flush(&mut outline, &mut body, &sink);
            outline.modules.push(FlatModule {
                title,
                chapters: Vec::new(),
            });
            sink = Sink::Nowhere;
        } else if let Some(title) = capture(&CHAPTER_LINE, line) {
            flush(&mut outline, &mut body, &sink);
            match outline.modules.last_mut() {
                Some(module) => {
                    module.chapters.push(FlatChapter {
                        title,
                        pages: Vec::new(),
                    });
                    sink = Sink::Nowhere;
                }
                None => {
                    outline.orphaned_chapters += 1;
                    sink = Sink::Discard;
                }
            }
        } else if let Some(title) = capture(&PAGE_LINE, line) {
            flush(&mut outline, &mut body, &sink);
            match outline.modules.last_mut().and_then(|m| m.chapters.last_mut()) {
                Some(chapter) => {
                    chapter.pages.push(FlatPage {
                        title,
                        body: String::new(),
                    });
                    sink = Sink::Page;
                }
                None => {
                    outline.orphaned_pages += 1;
                    sink = Sink::Discard;
                }
            }
        } else if sink == Sink::Page {
            body.push(line);
        } else if sink == Sink::Nowhere && !line.trim().is_empty() {
            outline.dropped_lines += 1;
        }
    }
    flush(&mut outline, &mut body, &sink);

    outline
}

fn capture(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Render modules as a flat document.
///
/// Walks every page in tree order. A module delimiter is written whenever
/// the module title differs from the previous page's, and it always forces
/// a chapter delimiter after it; otherwise a chapter delimiter is written
/// when the chapter title changes. Each delimiter line is followed by a
/// blank line. Modules and chapters without pages produce nothing.
pub fn render_flat(modules: &[Module]) -> String {
    let mut out = String::new();
    let mut last_module: Option<&str> = None;
    let mut last_chapter: Option<&str> = None;

    for module in modules {
        for chapter in &module.chapters {
            for page in &chapter.pages {
                if last_module != Some(module.title.as_str()) {
                    out.push_str(&format!("=== {} ===\n\n", module.title));
                    last_module = Some(module.title.as_str());
                    last_chapter = None;
                }
                if last_chapter != Some(chapter.title.as_str()) {
                    out.push_str(&format!("--- {} ---\n\n", chapter.title));
                    last_chapter = Some(chapter.title.as_str());
                }
                out.push_str(&format!("+++ {} +++\n\n", page.title()));
                let body = page.content.trim();
                if !body.is_empty() {
                    out.push_str(body);
                    out.push_str("\n\n");
                }
            }
        }
    }
    out
}

impl ContentTree {
    /// Build modules, chapters and pages from a flat document.
    ///
    /// With `clear_existing`, every module under the root is removed first
    /// and numbering starts at 001. Otherwise new modules are numbered after
    /// the largest existing module prefix. Each page is written as a title
    /// marker followed by its trimmed body and a newline.
    pub fn import_flat(
        &self,
        document: &str,
        clear_existing: bool,
    ) -> Result<ImportReport, TreeError> {
        let outline = parse_flat(document);
        let _guard = self.lock();
        self.ensure_root()?;

        let existing = list_entries(&self.root, NodeKind::Module)?;
        if clear_existing {
            for name in &existing {
                let path = self.root.join(name);
                fs::remove_dir_all(&path).map_err(TreeError::io(format!(
                    "failed to clear {}",
                    path.display()
                )))?;
            }
        }
        let first_order = if clear_existing {
            1
        } else {
            next_order(&existing)
        };

        let mut report = ImportReport {
            modules: outline.modules.len(),
            dropped_lines: outline.dropped_lines,
            orphaned_pages: outline.orphaned_pages,
            orphaned_chapters: outline.orphaned_chapters,
            ..ImportReport::default()
        };

        for (mi, module) in outline.modules.iter().enumerate() {
            let module_dir = entry_name(&format_order(first_order + mi as u32), &module.title, false);
            let module_path = self.root.join(&module_dir);
            fs::create_dir_all(&module_path).map_err(TreeError::io(format!(
                "failed to create {}",
                module_path.display()
            )))?;

            for (ci, chapter) in module.chapters.iter().enumerate() {
                let chapter_dir = entry_name(&format_order(ci as u32 + 1), &chapter.title, false);
                let chapter_path = module_path.join(&chapter_dir);
                fs::create_dir_all(&chapter_path).map_err(TreeError::io(format!(
                    "failed to create {}",
                    chapter_path.display()
                )))?;
                report.chapters += 1;

                for (pi, page) in chapter.pages.iter().enumerate() {
                    let filename = entry_name(&format_order(pi as u32 + 1), &page.title, true);
                    let path = chapter_path.join(&filename);
                    let titles = TitleTriple::new(&module.title, &chapter.title, &page.title);
                    let raw = format!("{}{}\n", titles.to_marker(), page.body.trim());
                    fs::write(&path, raw).map_err(TreeError::io(format!(
                        "failed to write page {}",
                        path.display()
                    )))?;
                    report.pages += 1;
                }
            }
        }

        if report.dropped_lines > 0 || report.orphaned_pages > 0 || report.orphaned_chapters > 0 {
            warn!(
                dropped_lines = report.dropped_lines,
                orphaned_pages = report.orphaned_pages,
                orphaned_chapters = report.orphaned_chapters,
                "import discarded content that had no enclosing module or chapter"
            );
        }
        info!(
            modules = report.modules,
            chapters = report.chapters,
            pages = report.pages,
            cleared = clear_existing,
            "imported flat document"
        );
        Ok(report)
    }

    /// Render the whole tree as a flat document.
    pub fn export_flat(&self) -> Result<String, TreeError> {
        Ok(render_flat(&self.load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
=== Guide ===
--- Setup ---
+++ Install +++
Line one

Line two
+++ Configure +++
<agent><prompt>Explain config</prompt></agent>
--- Usage ---
=== Reference ===
--- API ---
+++ Endpoints +++
GET /
";

    #[test]
    fn parses_nested_structure() {
        let outline = parse_flat(SAMPLE);
        assert_eq!(outline.modules.len(), 2);
        let guide = &outline.modules[0];
        assert_eq!(guide.title, "Guide");
        assert_eq!(guide.chapters.len(), 2);
        assert_eq!(guide.chapters[0].pages.len(), 2);
        assert_eq!(guide.chapters[0].pages[0].body, "Line one\n\nLine two");
        assert!(guide.chapters[1].pages.is_empty());
        assert_eq!(outline.modules[1].chapters[0].pages[0].body, "GET /\n");
        assert_eq!(outline.dropped_lines, 0);
    }

    #[test]
    fn counts_content_without_a_home() {
        let doc = "stray text\n+++ Orphan +++\norphan body\n--- Lost ---\n+++ Also lost +++\n=== M ===\n--- C ---\n+++ P +++\nkept\n";
        let outline = parse_flat(doc);

        assert_eq!(outline.dropped_lines, 1);
        assert_eq!(outline.orphaned_pages, 2);
        assert_eq!(outline.orphaned_chapters, 1);
        assert_eq!(outline.modules.len(), 1);
        assert_eq!(outline.modules[0].chapters[0].pages[0].body, "kept\n");
    }

    #[test]
    fn normalizes_crlf() {
        let outline = parse_flat("=== M ===\r\n--- C ---\r\n+++ P +++\r\nbody\r\n");
        assert_eq!(outline.modules[0].chapters[0].pages[0].body, "body\n");
    }

    #[test]
    fn import_then_export() {
        let tmp = TempDir::new().unwrap();
        let tree = ContentTree::new(tmp.path());

        let report = tree.import_flat(SAMPLE, false).unwrap();
        assert_eq!(report.modules, 2);
        assert_eq!(report.chapters, 3);
        assert_eq!(report.pages, 3);

        let raw = fs::read_to_string(tmp.path().join("001-guide/001-setup/001-install.md")).unwrap();
        assert_eq!(raw, "<!-- title: Guide > Setup > Install -->\nLine one\n\nLine two\n");

        let exported = tree.export_flat().unwrap();
        assert!(exported.starts_with("=== Guide ===\n\n--- Setup ---\n\n+++ Install +++\n\n"));

        let reparsed = parse_flat(&exported);
        assert_eq!(reparsed.modules.len(), 2);
        assert_eq!(reparsed.modules[0].chapters[0].pages[1].title, "Configure");
        assert_eq!(
            reparsed.modules[0].chapters[0].pages[1].body.trim(),
            "<agent><prompt>Explain config</prompt></agent>"
        );
    }

    #[test]
    fn import_appends_after_existing_modules() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("003-existing")).unwrap();
        let tree = ContentTree::new(tmp.path());

        tree.import_flat("=== New ===\n--- C ---\n", false).unwrap();
        assert!(tmp.path().join("003-existing").is_dir());
        assert!(tmp.path().join("004-new/001-c").is_dir());
    }

    #[test]
    fn import_with_clear_replaces_everything() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("003-existing")).unwrap();
        let tree = ContentTree::new(tmp.path());

        tree.import_flat("=== New ===\n", true).unwrap();
        assert!(!tmp.path().join("003-existing").exists());
        assert!(tmp.path().join("001-new").is_dir());
    }

    fn module(title: &str, chapters: Vec<(&str, Vec<&str>)>) -> Module {
        Module {
            id: format!("001-{title}"),
            order_prefix: "001".into(),
            title: title.into(),
            chapters: chapters
                .into_iter()
                .map(|(chapter, pages)| crate::tree::Chapter {
                    id: format!("001-{title}/001-{chapter}"),
                    name: format!("001-{chapter}"),
                    order_prefix: "001".into(),
                    title: chapter.into(),
                    pages: pages
                        .into_iter()
                        .map(|page| crate::tree::Page {
                            id: format!("001-{title}/001-{chapter}/001-{page}.md"),
                            filename: format!("001-{page}.md"),
                            order_prefix: "001".into(),
                            titles: TitleTriple::new(title, chapter, page),
                            content: format!("\n{page} body\n"),
                            segment_count: 0,
                            module_path: format!("001-{title}"),
                            chapter_path: format!("001-{chapter}"),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn export_skips_empty_nodes() {
        let modules = vec![
            module("Empty", vec![]),
            module("Full", vec![("Bare", vec![]), ("Used", vec!["p"])]),
        ];
        assert_eq!(
            render_flat(&modules),
            "=== Full ===\n\n--- Used ---\n\n+++ p +++\n\np body\n\n"
        );
    }

    #[test]
    fn module_change_forces_chapter_delimiter() {
        let modules = vec![
            module("One", vec![("Intro", vec!["a"])]),
            module("Two", vec![("Intro", vec!["b"])]),
        ];
        let out = render_flat(&modules);
        assert_eq!(out.matches("--- Intro ---").count(), 2, "got:\n{out}");
        assert_eq!(parse_flat(&out).modules[1].chapters[0].pages[0].title, "b");
    }
}
