//! Configuration file management for quill.
//!
//! Provides a TOML-based config file at `~/.config/quill/config.toml` and a
//! resolution chain per setting: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONTENT_DIR_ENV: &str = "QUILL_CONTENT_DIR";
pub const MEMORY_DIR_ENV: &str = "QUILL_MEMORY_DIR";
pub const CLAUDE_BIN_ENV: &str = "QUILL_CLAUDE_BIN";

pub const DEFAULT_CONTENT_DIR: &str = "./content";
pub const DEFAULT_MEMORY_DIR: &str = "./memory";
pub const DEFAULT_CLAUDE_BIN: &str = "claude";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub content: ContentSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContentSection {
    /// Root directory of the content tree.
    pub root: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemorySection {
    /// Directory of `*.md` memory files.
    pub dir: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeneratorSection {
    /// Path to the `claude` binary.
    pub binary: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the quill config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/quill` or `~/.config/quill`,
/// including on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("quill");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("quill")
}

/// Return the path to the quill config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns `Ok(None)` if it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Settings given on the command line, each optional.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub content_dir: Option<String>,
    pub memory_dir: Option<String>,
    pub claude_bin: Option<String>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuillConfig {
    pub content_dir: PathBuf,
    pub memory_dir: PathBuf,
    pub claude_bin: String,
}

impl QuillConfig {
    /// Resolve every setting using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// - content root: `--content-dir` > `QUILL_CONTENT_DIR` > `[content] root` > `./content`
    /// - memory dir: `--memory-dir` > `QUILL_MEMORY_DIR` > `[memory] dir` > `./memory`
    /// - generator: `--claude-bin` > `QUILL_CLAUDE_BIN` > `[generator] binary` > `claude`
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();

        let content_dir = pick(
            cli.content_dir.as_deref(),
            CONTENT_DIR_ENV,
            file.content.root.as_deref(),
            DEFAULT_CONTENT_DIR,
        );
        let memory_dir = pick(
            cli.memory_dir.as_deref(),
            MEMORY_DIR_ENV,
            file.memory.dir.as_deref(),
            DEFAULT_MEMORY_DIR,
        );
        let claude_bin = pick(
            cli.claude_bin.as_deref(),
            CLAUDE_BIN_ENV,
            file.generator.binary.as_deref(),
            DEFAULT_CLAUDE_BIN,
        );

        Ok(Self {
            content_dir: PathBuf::from(content_dir),
            memory_dir: PathBuf::from(memory_dir),
            claude_bin,
        })
    }

    /// The config file that reproduces this configuration.
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            content: ContentSection {
                root: Some(self.content_dir.display().to_string()),
            },
            memory: MemorySection {
                dir: Some(self.memory_dir.display().to_string()),
            },
            generator: GeneratorSection {
                binary: Some(self.claude_bin.clone()),
            },
        }
    }
}

fn pick(cli: Option<&str>, env_key: &str, file: Option<&str>, default: &str) -> String {
    if let Some(value) = cli {
        value.to_string()
    } else if let Some(value) = std::env::var(env_key).ok().filter(|v| !v.is_empty()) {
        value
    } else if let Some(value) = file {
        value.to_string()
    } else {
        default.to_string()
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
