use serde::Serialize;

use super::TreeError;
use super::marker::TitleTriple;
use crate::segment::Segment;

/// A top-level directory of the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    /// Directory name, e.g. `001-getting-started`.
    pub id: String,
    pub order_prefix: String,
    pub title: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    /// `module/chapter` directory path relative to the root.
    pub id: String,
    /// Directory name alone.
    pub name: String,
    pub order_prefix: String,
    pub title: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// `module/chapter/file.md` path relative to the root.
    pub id: String,
    pub filename: String,
    pub order_prefix: String,
    pub titles: TitleTriple,
    /// Page body with the title marker removed.
    pub content: String,
    pub segment_count: usize,
    pub module_path: String,
    pub chapter_path: String,
}

impl Page {
    pub fn title(&self) -> &str {
        &self.titles.page
    }

    pub fn page_ref(&self) -> PageRef {
        PageRef {
            module: self.module_path.clone(),
            chapter: self.chapter_path.clone(),
            filename: self.filename.clone(),
        }
    }
}

/// Location of a page file: module directory, chapter directory, file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PageRef {
    pub module: String,
    pub chapter: String,
    pub filename: String,
}

impl PageRef {
    pub fn new(
        module: impl Into<String>,
        chapter: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            chapter: chapter.into(),
            filename: filename.into(),
        }
    }

    /// Parse `module/chapter/file.md`.
    pub fn parse(rel: &str) -> Result<Self, TreeError> {
        let parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [module, chapter, filename] => Ok(Self::new(*module, *chapter, *filename)),
            _ => Err(TreeError::InvalidPath(format!(
                "expected module/chapter/page.md, got {rel:?}"
            ))),
        }
    }

    pub fn rel_path(&self) -> String {
        format!("{}/{}/{}", self.module, self.chapter, self.filename)
    }

    pub fn chapter_rel(&self) -> String {
        format!("{}/{}", self.module, self.chapter)
    }
}

/// A page body as served for editing, with its segments resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub page: PageRef,
    pub titles: TitleTriple,
    pub content: String,
    pub segments: Vec<Segment>,
}
