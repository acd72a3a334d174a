use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::marker::{self, TitleTriple};
use super::model::{Chapter, Module, Page, PageRef, PageView};
use super::naming::{order_prefix, title_from_name};
use super::{ContentTree, NodeKind, TreeError, join_rel, list_entries};
use crate::segment;

impl ContentTree {
    /// Build the full Module > Chapter > Page read model from disk.
    ///
    /// A missing root yields an empty tree. Titles come from page markers
    /// where present: a chapter takes its title from its first page, a
    /// module from the first page of its first chapter. Everything else is
    /// derived from entry names.
    pub fn load(&self) -> Result<Vec<Module>, TreeError> {
        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "content root missing, tree is empty");
            return Ok(Vec::new());
        }

        let mut modules = Vec::new();
        let mut page_total = 0usize;

        for module_dir in list_entries(&self.root, NodeKind::Module)? {
            let module_path = self.root.join(&module_dir);
            let mut module = Module {
                id: module_dir.clone(),
                order_prefix: order_prefix(&module_dir).unwrap_or_default().to_string(),
                title: title_from_name(&module_dir),
                chapters: Vec::new(),
            };

            let chapter_dirs = list_entries(&module_path, NodeKind::Chapter)?;
            for (chapter_idx, chapter_dir) in chapter_dirs.into_iter().enumerate() {
                let chapter_path = module_path.join(&chapter_dir);
                let mut chapter = Chapter {
                    id: join_rel(&[&module_dir, &chapter_dir]),
                    name: chapter_dir.clone(),
                    order_prefix: order_prefix(&chapter_dir).unwrap_or_default().to_string(),
                    title: title_from_name(&chapter_dir),
                    pages: Vec::new(),
                };

                let filenames = list_entries(&chapter_path, NodeKind::Page)?;
                for (page_idx, filename) in filenames.into_iter().enumerate() {
                    let raw = read_page_file(&chapter_path.join(&filename))?;
                    let fallback = fallback_titles(&module_dir, &chapter_dir, &filename);
                    let (titles, body) = marker::split(&raw, &fallback);

                    if page_idx == 0 {
                        chapter.title = titles.chapter.clone();
                        if chapter_idx == 0 {
                            module.title = titles.module.clone();
                        }
                    }

                    chapter.pages.push(Page {
                        id: join_rel(&[&module_dir, &chapter_dir, &filename]),
                        order_prefix: order_prefix(&filename).unwrap_or_default().to_string(),
                        segment_count: segment::count(body),
                        content: body.to_string(),
                        titles,
                        filename,
                        module_path: module_dir.clone(),
                        chapter_path: chapter_dir.clone(),
                    });
                    page_total += 1;
                }

                module.chapters.push(chapter);
            }

            modules.push(module);
        }

        debug!(
            root = %self.root.display(),
            modules = modules.len(),
            pages = page_total,
            "loaded content tree"
        );
        Ok(modules)
    }

    /// Read one page: body without its marker, titles, and segments.
    pub fn get_page(&self, page: &PageRef) -> Result<PageView, TreeError> {
        let path = self.existing(NodeKind::Page, &page.rel_path())?;
        let raw = read_page_file(&path)?;
        let fallback = fallback_titles(&page.module, &page.chapter, &page.filename);
        let (titles, body) = marker::split(&raw, &fallback);

        Ok(PageView {
            page: page.clone(),
            titles,
            segments: segment::extract(body),
            content: body.to_string(),
        })
    }

    /// Replace a page body.
    ///
    /// The page's existing marker line is kept unless `content` brings its
    /// own. A page that does not exist yet is created when its chapter
    /// exists. Returns the number of segments in the new body.
    pub fn put_page(&self, page: &PageRef, content: &str) -> Result<usize, TreeError> {
        let path = self.resolve(NodeKind::Page, &page.rel_path())?;
        let chapter_dir = self.existing(NodeKind::Chapter, &page.chapter_rel())?;
        let _guard = self.lock();

        let prefix = if path.is_file() && !marker::has_marker(content) {
            let raw = read_page_file(&path)?;
            let body_len = marker::strip(&raw).len();
            raw[..raw.len() - body_len].to_string()
        } else {
            String::new()
        };

        let mut out = prefix;
        out.push_str(content);
        fs::write(&path, out).map_err(TreeError::io(format!(
            "failed to write page {}",
            path.display()
        )))?;

        let segments = segment::count(marker::strip(content));
        info!(
            page = %page.rel_path(),
            chapter = %chapter_dir.display(),
            segments,
            "saved page"
        );
        Ok(segments)
    }
}

pub(crate) fn read_page_file(path: &Path) -> Result<String, TreeError> {
    fs::read_to_string(path).map_err(TreeError::io(format!(
        "failed to read page {}",
        path.display()
    )))
}

/// Titles derived from entry names, used where a marker is missing.
pub(crate) fn fallback_titles(module: &str, chapter: &str, filename: &str) -> TitleTriple {
    TitleTriple::new(
        title_from_name(module),
        title_from_name(chapter),
        title_from_name(filename),
    )
}
