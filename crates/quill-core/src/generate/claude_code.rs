//! Claude Code generator.
//!
//! Runs `claude --print`, writes the assembled prompt to its stdin, and
//! takes trimmed stdout as the generated text.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::prompt::build_prompt;
use super::trait_def::Generator;
use super::{GenerationError, GenerationRequest};

/// Generator backed by the [Claude Code](https://docs.anthropic.com/en/docs/claude-code) CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCodeGenerator {
    /// Path to the binary. Defaults to `"claude"` (found via `$PATH`).
    binary: String,
    args: Vec<String>,
}

impl ClaudeCodeGenerator {
    /// Create a generator that runs `claude --print` from `$PATH`.
    pub fn new() -> Self {
        Self::with_binary("claude")
    }

    /// Create a generator with a custom binary path, still passing `--print`.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
            args: vec!["--print".to_string()],
        }
    }

    /// Create a generator that runs `binary` with exactly `args`.
    ///
    /// The prompt still arrives on stdin. Useful for wrappers and tests.
    pub fn with_command<I, S>(binary: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            binary: binary.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for ClaudeCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for ClaudeCodeGenerator {
    fn name(&self) -> &str {
        "claude-code"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let prompt = build_prompt(request);
        debug!(
            binary = %self.binary,
            kind = %request.kind,
            prompt_bytes = prompt.len(),
            memory_files = request.memory.len(),
            "invoking generator"
        );

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| GenerationError::Io {
            message: format!("{} stdin was not captured", self.binary),
            source: std::io::Error::other("missing stdin pipe"),
        })?;

        // Feed stdin while collecting output so a chatty child cannot block
        // on a full stdout pipe before it has read the whole prompt.
        let write = async move {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        let output = output.map_err(|source| GenerationError::Io {
            message: format!("failed to wait for {}", self.binary),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                binary = %self.binary,
                code = ?output.status.code(),
                "generator exited unsuccessfully"
            );
            return Err(GenerationError::Exit {
                binary: self.binary.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        written.map_err(|source| GenerationError::Io {
            message: format!("failed to write prompt to {}", self.binary),
            source,
        })?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(binary = %self.binary, output_bytes = text.len(), "generator finished");
        Ok(text)
    }
}
