//! Content tree: the Module > Chapter > Page hierarchy on disk.
//!
//! ```text
//! <root>/
//!   001-getting-started/            module
//!     001-installation/             chapter
//!       001-requirements.md         page
//!       002-first-run.md
//!     002-configuration/
//!   002-advanced-topics/
//! ```
//!
//! Every entry is named `{order}-{slug}` where `order` is a zero-padded
//! three digit numeral; traversal order is the numeric order of that prefix.
//! A page may begin with a marker line carrying the original titles:
//!
//! ```text
//! <!-- title: Getting Started > Installation > Requirements -->
//! ```
//!
//! The in-memory [`Module`] tree is a read model rebuilt from disk by every
//! [`ContentTree::load`]; nothing is cached between calls.

mod create;
mod flat;
mod load;
pub mod marker;
mod model;
pub mod naming;
mod reorder;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

pub use flat::{FlatChapter, FlatModule, FlatOutline, FlatPage, ImportReport, parse_flat, render_flat};
pub use marker::TitleTriple;
pub use model::{Chapter, Module, Page, PageRef, PageView};

/// Errors produced by content tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A module, chapter or page path does not exist.
    #[error("{kind} not found: {}", .path.display())]
    NotFound { kind: NodeKind, path: PathBuf },

    /// The content root directory does not exist.
    #[error("content root does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    /// A rename or reorder target is already occupied by another entry.
    #[error("target already exists: {}", .0.display())]
    Collision(PathBuf),

    /// A path argument is not a plain relative path of the expected depth.
    #[error("invalid content path: {0}")]
    InvalidPath(String),

    /// The same sibling was listed twice in a reorder request.
    #[error("name listed more than once: {0:?}")]
    DuplicateName(String),

    /// A reorder failed and rolling back did not restore every entry.
    #[error(
        "reorder failed and could not be fully rolled back; entries left under staging names: {}",
        .stranded.join(", ")
    )]
    ReorderIncomplete {
        stranded: Vec<String>,
        #[source]
        source: io::Error,
    },

    /// A filesystem operation failed.
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },
}

impl TreeError {
    pub(crate) fn io(message: impl Into<String>) -> impl FnOnce(io::Error) -> TreeError {
        let message = message.into();
        move |source| TreeError::Io { message, source }
    }
}

/// The three levels of the content hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Chapter,
    Page,
}

impl NodeKind {
    /// Number of path components below the root.
    pub fn depth(self) -> usize {
        match self {
            Self::Module => 1,
            Self::Chapter => 2,
            Self::Page => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Chapter => "chapter",
            Self::Page => "page",
        }
    }

    /// Pages are files, modules and chapters are directories.
    pub fn is_file(self) -> bool {
        matches!(self, Self::Page)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(Self::Module),
            "chapter" => Ok(Self::Chapter),
            "page" => Ok(Self::Page),
            other => Err(format!(
                "invalid node type {other:?} (expected module, chapter, or page)"
            )),
        }
    }
}

/// Handle on a content root directory.
///
/// Cheap to clone. Clones share one mutation lock so that create, rename,
/// reorder, delete and import calls made through the same tree are
/// serialised within a process. Writers in other processes are not covered
/// and need their own mutual exclusion around a read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct ContentTree {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ContentTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), TreeError> {
        fs::create_dir_all(&self.root).map_err(TreeError::io(format!(
            "failed to create content root {}",
            self.root.display()
        )))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve a root-relative path of `kind`, validating its shape only.
    pub(crate) fn resolve(&self, kind: NodeKind, rel: &str) -> Result<PathBuf, TreeError> {
        let names = split_rel(rel, kind.depth())?;
        if kind.is_file() && !naming::is_page_file(names[names.len() - 1]) {
            return Err(TreeError::InvalidPath(format!(
                "page path must name a .md file: {rel:?}"
            )));
        }
        Ok(names.iter().fold(self.root.clone(), |p, n| p.join(n)))
    }

    /// Resolve the directory that holds siblings of `kind` (the root for
    /// modules).
    pub(crate) fn resolve_parent(&self, kind: NodeKind, rel: &str) -> Result<PathBuf, TreeError> {
        let names = split_rel(rel, kind.depth() - 1)?;
        Ok(names.iter().fold(self.root.clone(), |p, n| p.join(n)))
    }

    /// Resolve `rel` and require that it exists with the right file type.
    pub(crate) fn existing(&self, kind: NodeKind, rel: &str) -> Result<PathBuf, TreeError> {
        let path = self.resolve(kind, rel)?;
        let present = if kind.is_file() {
            path.is_file()
        } else {
            path.is_dir()
        };
        if !present {
            return Err(TreeError::NotFound { kind, path });
        }
        Ok(path)
    }
}

/// Split a relative path into exactly `depth` plain name components.
fn split_rel(rel: &str, depth: usize) -> Result<Vec<&str>, TreeError> {
    let mut names = Vec::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| TreeError::InvalidPath(format!("non UTF-8 path: {rel:?}")))?;
                if name.starts_with('.') {
                    return Err(TreeError::InvalidPath(format!(
                        "hidden entries are not content: {rel:?}"
                    )));
                }
                names.push(name);
            }
            Component::CurDir => {}
            _ => {
                return Err(TreeError::InvalidPath(format!(
                    "path must be relative to the content root: {rel:?}"
                )));
            }
        }
    }
    if names.len() != depth {
        return Err(TreeError::InvalidPath(format!(
            "expected {depth} path component(s), got {}: {rel:?}",
            names.len()
        )));
    }
    Ok(names)
}

/// Sibling entries of `kind` inside `dir`, in traversal order.
///
/// Hidden entries (names starting with `.`) are skipped; this also hides
/// entries parked under staging names by an in-flight reorder.
pub(crate) fn list_entries(dir: &Path, kind: NodeKind) -> Result<Vec<String>, TreeError> {
    let read = fs::read_dir(dir).map_err(TreeError::io(format!(
        "failed to list {}",
        dir.display()
    )))?;

    let mut names = Vec::new();
    for entry in read {
        let entry = entry.map_err(TreeError::io(format!("failed to list {}", dir.display())))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry
            .file_type()
            .map_err(TreeError::io(format!("failed to stat {name}")))?;
        let wanted = if kind.is_file() {
            file_type.is_file() && naming::is_page_file(&name)
        } else {
            file_type.is_dir()
        };
        if wanted {
            names.push(name);
        }
    }

    naming::sort_by_order(&mut names);
    Ok(names)
}

/// Join root-relative name components with `/`.
pub(crate) fn join_rel(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_parses_and_displays() {
        for kind in [NodeKind::Module, NodeKind::Chapter, NodeKind::Page] {
            assert_eq!(kind.to_string().parse::<NodeKind>().unwrap(), kind);
        }
        assert!("book".parse::<NodeKind>().is_err());
    }

    #[test]
    fn resolve_checks_depth_and_shape() {
        let tree = ContentTree::new("/content");

        assert_eq!(
            tree.resolve(NodeKind::Chapter, "001-a/002-b").unwrap(),
            PathBuf::from("/content/001-a/002-b")
        );
        assert!(matches!(
            tree.resolve(NodeKind::Chapter, "001-a"),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.resolve(NodeKind::Module, "../escape"),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.resolve(NodeKind::Module, "/abs"),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.resolve(NodeKind::Page, "001-a/001-b/001-c.txt"),
            Err(TreeError::InvalidPath(_))
        ));
        assert_eq!(
            tree.resolve_parent(NodeKind::Module, "").unwrap(),
            PathBuf::from("/content")
        );
    }

    #[test]
    fn join_rel_skips_empty_parts() {
        assert_eq!(join_rel(&["", "001-a"]), "001-a");
        assert_eq!(join_rel(&["001-a", "002-b", "003-c.md"]), "001-a/002-b/003-c.md");
    }

    #[test]
    fn list_entries_orders_numerically_and_hides_staging() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["010-ten", "002-two", "001-one", ".reorder-x-0"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(tmp.path().join("003-page.md"), "x").unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let dirs = list_entries(tmp.path(), NodeKind::Module).unwrap();
        assert_eq!(dirs, vec!["001-one", "002-two", "010-ten"]);

        let pages = list_entries(tmp.path(), NodeKind::Page).unwrap();
        assert_eq!(pages, vec!["003-page.md"]);
    }
}
