//! Memory corpus: loading, and managing the `*.md` files it is read from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::trait_def::Generator;
use super::{GenerationError, GenerationRequest, Memory};
use crate::segment::SegmentKind;

const MEMORY_EXTENSION: &str = ".md";

/// Errors raised while managing memory files.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The name is not a plain, visible file name.
    #[error("invalid memory file name: {0:?}")]
    InvalidName(String),

    #[error("memory file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The destination of a rename is already taken.
    #[error("memory file already exists: {}", .0.display())]
    Collision(PathBuf),

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl MemoryError {
    fn io(message: String) -> impl FnOnce(io::Error) -> MemoryError {
        move |source| MemoryError::Io { message, source }
    }
}

/// Read every `*.md` file directly inside `dir` into a [`Memory`] map.
///
/// A missing directory is an empty corpus. Subdirectories and hidden files
/// are ignored, as are files that are not valid UTF-8 (with a warning).
pub fn load_memory_dir(dir: &Path) -> Result<Memory, GenerationError> {
    let mut memory = Memory::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "memory directory missing, using empty corpus");
            return Ok(memory);
        }
        Err(source) => {
            return Err(GenerationError::Io {
                message: format!("failed to list memory directory {}", dir.display()),
                source,
            });
        }
    };

    for entry in entries {
        let entry = entry.map_err(|source| GenerationError::Io {
            message: format!("failed to list memory directory {}", dir.display()),
            source,
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || !name.ends_with(".md") || !path.is_file() {
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(body) => {
                memory.insert(name.to_string(), body);
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(path = %path.display(), "skipping memory file that is not UTF-8");
            }
            Err(source) => {
                return Err(GenerationError::Io {
                    message: format!("failed to read memory file {}", path.display()),
                    source,
                });
            }
        }
    }

    debug!(dir = %dir.display(), files = memory.len(), "loaded memory corpus");
    Ok(memory)
}

/// Normalise a memory file name: `.md` is appended when missing. The
/// name must be a single visible path component.
pub fn memory_file_name(name: &str) -> Result<String, MemoryError> {
    let name = name.trim();
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && name != MEMORY_EXTENSION;
    if !plain {
        return Err(MemoryError::InvalidName(name.to_string()));
    }
    Ok(if name.ends_with(MEMORY_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{MEMORY_EXTENSION}")
    })
}

/// Write `content` to memory file `name`, creating `dir` if needed.
/// An existing file is overwritten. Returns the file name used.
pub fn save_memory(dir: &Path, name: &str, content: &str) -> Result<String, MemoryError> {
    let filename = memory_file_name(name)?;
    fs::create_dir_all(dir).map_err(MemoryError::io(format!(
        "failed to create memory directory {}",
        dir.display()
    )))?;

    let path = dir.join(&filename);
    fs::write(&path, content).map_err(MemoryError::io(format!(
        "failed to write memory file {}",
        path.display()
    )))?;

    info!(file = %filename, bytes = content.len(), "saved memory file");
    Ok(filename)
}

/// Rename memory file `old` to `new`. Renaming a file to its own name is a
/// no-op. Returns the new file name.
pub fn rename_memory(dir: &Path, old: &str, new: &str) -> Result<String, MemoryError> {
    let from = memory_file_name(old)?;
    let to = memory_file_name(new)?;
    let from_path = dir.join(&from);
    if !from_path.is_file() {
        return Err(MemoryError::NotFound(from_path));
    }
    if from == to {
        return Ok(to);
    }

    let to_path = dir.join(&to);
    if to_path.exists() {
        return Err(MemoryError::Collision(to_path));
    }
    fs::rename(&from_path, &to_path).map_err(MemoryError::io(format!(
        "failed to rename memory file {} to {to}",
        from_path.display()
    )))?;

    info!(from = %from, to = %to, "renamed memory file");
    Ok(to)
}

/// Remove memory file `name`.
pub fn delete_memory(dir: &Path, name: &str) -> Result<(), MemoryError> {
    let filename = memory_file_name(name)?;
    let path = dir.join(&filename);
    if !path.is_file() {
        return Err(MemoryError::NotFound(path));
    }
    fs::remove_file(&path).map_err(MemoryError::io(format!(
        "failed to delete memory file {}",
        path.display()
    )))?;

    info!(file = %filename, "deleted memory file");
    Ok(())
}

/// Ask `generator` to write a memory file from a short description, and
/// save the result as `name`. The existing corpus is sent along as memory.
/// Nothing is written when generation fails.
pub async fn generate_memory(
    dir: &Path,
    name: &str,
    description: &str,
    generator: &dyn Generator,
) -> Result<String, MemoryError> {
    let filename = memory_file_name(name)?;
    let prompt = format!(
        "Create a memory file based on this description: {}\n\n\
         Provide the content in markdown format that can be used as context for writing.",
        description.trim()
    );
    let request =
        GenerationRequest::new(prompt, SegmentKind::Prompt).with_memory(load_memory_dir(dir)?);

    let content = generator.generate(&request).await?;
    debug!(generator = generator.name(), file = %filename, "generated memory file");
    save_memory(dir, &filename, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Canned(&'static str);

    #[async_trait]
    impl Generator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            assert!(request.prompt.starts_with("Create a memory file based on this description:"));
            Ok(self.0.to_string())
        }
    }

    struct Refusing;

    #[async_trait]
    impl Generator for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            Err(GenerationError::Exit {
                binary: "refusing".into(),
                code: Some(2),
                stderr: "no".into(),
            })
        }
    }

    #[test]
    fn file_names_get_extension_and_reject_paths() {
        assert_eq!(memory_file_name("style").unwrap(), "style.md");
        assert_eq!(memory_file_name("style.md").unwrap(), "style.md");
        for bad in ["", "  ", ".hidden", "../escape", "a/b", ".md"] {
            assert!(
                matches!(memory_file_name(bad), Err(MemoryError::InvalidName(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn save_creates_directory_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("memory");

        assert_eq!(save_memory(&dir, "tone", "first").unwrap(), "tone.md");
        save_memory(&dir, "tone.md", "second").unwrap();

        let memory = load_memory_dir(&dir).unwrap();
        assert_eq!(memory["tone.md"], "second");
    }

    #[test]
    fn rename_moves_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("old.md"), "body").unwrap();

        assert_eq!(rename_memory(tmp.path(), "old.md", "new").unwrap(), "new.md");
        assert!(!tmp.path().join("old.md").exists());
        assert_eq!(fs::read_to_string(tmp.path().join("new.md")).unwrap(), "body");
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("same.md"), "body").unwrap();

        assert_eq!(rename_memory(tmp.path(), "same.md", "same").unwrap(), "same.md");
        assert_eq!(fs::read_to_string(tmp.path().join("same.md")).unwrap(), "body");
    }

    #[test]
    fn rename_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = rename_memory(tmp.path(), "ghost.md", "other.md").unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)), "got: {err}");
    }

    #[test]
    fn rename_onto_existing_collides() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        fs::write(tmp.path().join("b.md"), "b").unwrap();

        let err = rename_memory(tmp.path(), "a.md", "b.md").unwrap_err();
        assert!(matches!(err, MemoryError::Collision(_)), "got: {err}");
        assert_eq!(fs::read_to_string(tmp.path().join("a.md")).unwrap(), "a");
        assert_eq!(fs::read_to_string(tmp.path().join("b.md")).unwrap(), "b");
    }

    #[test]
    fn delete_removes_file_once() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("gone.md"), "x").unwrap();

        delete_memory(tmp.path(), "gone").unwrap();
        assert!(!tmp.path().join("gone.md").exists());

        let err = delete_memory(tmp.path(), "gone").unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)), "got: {err}");
    }

    #[tokio::test]
    async fn generate_saves_generator_output() {
        let tmp = TempDir::new().unwrap();
        let name = generate_memory(tmp.path(), "audience", "who reads the book", &Canned("Engineers."))
            .await
            .unwrap();

        assert_eq!(name, "audience.md");
        assert_eq!(
            fs::read_to_string(tmp.path().join("audience.md")).unwrap(),
            "Engineers."
        );
    }

    #[tokio::test]
    async fn failed_generation_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let err = generate_memory(tmp.path(), "audience", "x", &Refusing)
            .await
            .unwrap_err();

        assert!(matches!(err, MemoryError::Generation(_)), "got: {err}");
        assert!(!tmp.path().join("audience.md").exists());
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let memory = load_memory_dir(&tmp.path().join("none")).unwrap();
        assert!(memory.is_empty());
    }

    #[test]
    fn loads_markdown_files_only() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("style.md"), "Be concise.").unwrap();
        fs::write(tmp.path().join("glossary.md"), "Terms.").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(tmp.path().join(".hidden.md"), "ignored").unwrap();
        fs::create_dir(tmp.path().join("sub.md")).unwrap();
        fs::write(tmp.path().join("binary.md"), [0xff, 0xfe, 0x00]).unwrap();

        let memory = load_memory_dir(tmp.path()).unwrap();
        let names: Vec<&str> = memory.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["glossary.md", "style.md"]);
        assert_eq!(memory["style.md"], "Be concise.");
    }
}
