//! Shared test utilities for quill integration tests.
//!
//! - [`TempContentTree`]: a [`ContentTree`] rooted in a temporary directory
//!   that is removed on drop, with helpers for laying out pages.
//! - [`ScriptedGenerator`] and [`FailingGenerator`]: [`Generator`] fakes
//!   that never spawn a process.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use quill_core::generate::{GenerationError, GenerationRequest, Generator};
use quill_core::tree::ContentTree;

/// A content tree in a fresh temporary directory.
pub struct TempContentTree {
    /// Held to keep the directory alive.
    _dir: TempDir,
    root: PathBuf,
    tree: ContentTree,
}

impl TempContentTree {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path().join("content");
        fs::create_dir_all(&root).expect("failed to create content root");
        let tree = ContentTree::new(&root);
        Self {
            _dir: dir,
            root,
            tree,
        }
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a file at a root-relative path, creating parent directories.
    pub fn write_page(&self, rel: &str, raw: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create page parent");
        }
        fs::write(&path, raw).expect("failed to write page");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel))
            .unwrap_or_else(|e| panic!("failed to read {rel}: {e}"))
    }

    /// Directory and file names directly under `rel` (`""` for the root),
    /// sorted lexically, hidden entries included.
    pub fn list(&self, rel: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.root.join(rel))
            .unwrap_or_else(|e| panic!("failed to list {rel}: {e}"))
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for TempContentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns queued responses in order and records every request.
///
/// Once the queue is empty it answers `"generated: <prompt>"`.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let next = self.responses.lock().expect("responses lock").pop_front();
        Ok(next.unwrap_or_else(|| format!("generated: {}", request.prompt)))
    }
}

/// Fails every request with a nonzero exit.
pub struct FailingGenerator {
    pub stderr: String,
}

impl FailingGenerator {
    pub fn new(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
        }
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Exit {
            binary: "failing".to_string(),
            code: Some(1),
            stderr: self.stderr.clone(),
        })
    }
}
