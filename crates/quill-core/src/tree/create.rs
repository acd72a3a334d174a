use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use super::load::{fallback_titles, read_page_file};
use super::marker::{self, TitleTriple};
use super::model::PageRef;
use super::naming::{entry_name, format_order, next_order};
use super::{ContentTree, NodeKind, TreeError, join_rel, list_entries};

impl ContentTree {
    /// Create a module directory numbered after the existing ones.
    /// Returns its directory name.
    pub fn create_module(&self, title: &str) -> Result<String, TreeError> {
        let _guard = self.lock();
        self.ensure_root()?;

        let siblings = list_entries(&self.root, NodeKind::Module)?;
        let name = entry_name(&format_order(next_order(&siblings)), title, false);
        create_dir_new(&self.root.join(&name))?;

        info!(module = %name, title, "created module");
        Ok(name)
    }

    /// Create a chapter directory inside `module`. Returns its directory name.
    pub fn create_chapter(&self, module: &str, title: &str) -> Result<String, TreeError> {
        let _guard = self.lock();
        let module_path = self.existing(NodeKind::Module, module)?;

        let siblings = list_entries(&module_path, NodeKind::Chapter)?;
        let name = entry_name(&format_order(next_order(&siblings)), title, false);
        create_dir_new(&module_path.join(&name))?;

        info!(module, chapter = %name, title, "created chapter");
        Ok(name)
    }

    /// Create a page file in `module/chapter`, headed by a title marker.
    ///
    /// Module and chapter titles are taken from the marker of an existing
    /// page in the same chapter. Failing that, the module title comes from
    /// a page in another chapter of the module, and whatever is still
    /// missing is derived from directory names.
    pub fn create_page(
        &self,
        module: &str,
        chapter: &str,
        title: &str,
        content: &str,
    ) -> Result<PageRef, TreeError> {
        let _guard = self.lock();
        let chapter_path = self.existing(NodeKind::Chapter, &join_rel(&[module, chapter]))?;

        let siblings = list_entries(&chapter_path, NodeKind::Page)?;
        let filename = entry_name(&format_order(next_order(&siblings)), title, true);
        let path = chapter_path.join(&filename);
        if path.exists() {
            return Err(TreeError::Collision(path));
        }

        let mut titles = self.inherited_titles(module, chapter)?;
        titles.page = title.to_string();

        fs::write(&path, marker::with_marker(&titles, content)).map_err(TreeError::io(
            format!("failed to write page {}", path.display()),
        ))?;

        let page = PageRef::new(module, chapter, filename);
        info!(page = %page.rel_path(), title, "created page");
        Ok(page)
    }

    /// Remove a module or chapter with everything below it, or one page.
    pub fn delete(&self, kind: NodeKind, rel: &str) -> Result<(), TreeError> {
        let _guard = self.lock();
        let path = self.existing(kind, rel)?;

        let result = if kind.is_file() {
            fs::remove_file(&path)
        } else {
            fs::remove_dir_all(&path)
        };
        result.map_err(TreeError::io(format!("failed to delete {}", path.display())))?;

        info!(kind = %kind, path = rel, "deleted");
        Ok(())
    }

    fn inherited_titles(&self, module: &str, chapter: &str) -> Result<TitleTriple, TreeError> {
        let fallback = fallback_titles(module, chapter, "");
        let module_path = self.root.join(module);

        if let Some(found) = first_marker(&module_path.join(chapter), &fallback)? {
            return Ok(TitleTriple::new(found.module, found.chapter, ""));
        }

        for other in list_entries(&module_path, NodeKind::Chapter)? {
            if other == chapter {
                continue;
            }
            if let Some(found) = first_marker(&module_path.join(&other), &fallback)? {
                return Ok(TitleTriple::new(found.module, fallback.chapter, ""));
            }
        }

        Ok(fallback)
    }
}

/// Titles from the first page in `chapter_path` that carries a marker.
fn first_marker(
    chapter_path: &Path,
    fallback: &TitleTriple,
) -> Result<Option<TitleTriple>, TreeError> {
    for filename in list_entries(chapter_path, NodeKind::Page)? {
        let raw = read_page_file(&chapter_path.join(filename))?;
        if marker::has_marker(&raw) {
            return Ok(Some(marker::split(&raw, fallback).0));
        }
    }
    Ok(None)
}

fn create_dir_new(path: &Path) -> Result<(), TreeError> {
    fs::create_dir(path).map_err(|source| match source.kind() {
        io::ErrorKind::AlreadyExists => TreeError::Collision(path.to_path_buf()),
        _ => TreeError::Io {
            message: format!("failed to create {}", path.display()),
            source,
        },
    })
}
