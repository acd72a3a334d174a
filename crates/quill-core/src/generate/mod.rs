//! Text generation: the collaborator that turns a task prompt into content.
//!
//! [`Generator`] is the seam; [`ClaudeCodeGenerator`] is the production
//! implementation backed by the `claude` CLI. Requests carry the memory
//! corpus (shared reference documents) and optional surrounding text.

pub mod claude_code;
pub mod memory;
pub mod prompt;
pub mod trait_def;

use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

pub use claude_code::ClaudeCodeGenerator;
pub use memory::{
    MemoryError, delete_memory, generate_memory, load_memory_dir, rename_memory, save_memory,
};
pub use prompt::build_prompt;
pub use trait_def::Generator;

use crate::segment::SegmentKind;

/// Memory corpus: file name to file contents, in name order.
pub type Memory = BTreeMap<String, String>;

/// Everything a generator needs for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub kind: SegmentKind,
    /// Text around the segment (its chunk, or the whole page).
    pub context: Option<String>,
    pub memory: Memory,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            prompt: prompt.into(),
            kind,
            context: None,
            memory: Memory::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }
}

/// Errors raised while producing text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The generator process could not be started.
    #[error("failed to spawn {binary:?}; is it installed and on PATH?")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    /// Talking to the generator process failed.
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    /// The generator process exited unsuccessfully.
    #[error("{binary} exited with {}: {stderr}", exit_label(.code))]
    Exit {
        binary: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
