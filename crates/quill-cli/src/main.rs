mod config;
mod document_cmds;
mod tree_cmds;

#[cfg(test)]
mod test_util;

use std::io::Read;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use config::{CliOverrides, QuillConfig};

#[derive(Parser)]
#[command(name = "quill", about = "Resolve task markers in long-form markdown")]
struct Cli {
    /// Content tree root (overrides QUILL_CONTENT_DIR env var)
    #[arg(long, global = true)]
    content_dir: Option<String>,

    /// Memory directory of *.md files (overrides QUILL_MEMORY_DIR env var)
    #[arg(long, global = true)]
    memory_dir: Option<String>,

    /// Path to the claude binary (overrides QUILL_CLAUDE_BIN env var)
    #[arg(long, global = true)]
    claude_bin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a quill config file from the resolved settings
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the segments and chunks of a markdown file as JSON
    Parse {
        /// Markdown file to parse ("-" reads stdin)
        file: String,
    },
    /// Generate text for every segment of a markdown file
    Process {
        /// Markdown file to process
        file: String,
        /// Rewrite the file in place instead of printing the result
        #[arg(long)]
        write: bool,
        /// Only include these memory files (repeatable)
        #[arg(long = "memory")]
        memory: Vec<String>,
    },
    /// Generate text for a single segment of a markdown file
    Segment {
        /// Markdown file to process
        file: String,
        /// Zero-based segment index
        index: usize,
        /// Use only the segment's chunk as context
        #[arg(long)]
        within_chunk: bool,
        /// Rewrite the file in place instead of printing the result
        #[arg(long)]
        write: bool,
        /// Only include these memory files (repeatable)
        #[arg(long = "memory")]
        memory: Vec<String>,
    },
    /// Memory file management
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Content tree management
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
    },
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// List memory files and their sizes
    List,
    /// Write a memory file, replacing any existing one
    Save {
        /// Memory file name (".md" is appended when missing)
        name: String,
        /// File holding the content (defaults to stdin)
        #[arg(long)]
        file: Option<String>,
    },
    /// Rename a memory file
    Rename {
        /// Current memory file name
        old: String,
        /// New memory file name
        new: String,
    },
    /// Delete a memory file
    Delete {
        /// Memory file name
        name: String,
    },
    /// Generate a memory file from a short description
    Generate {
        /// Memory file name to save the result as
        name: String,
        /// What the memory file should cover
        description: String,
    },
}

#[derive(Subcommand)]
pub enum TreeCommands {
    /// Print the whole content tree as JSON
    Show,
    /// Print one page (body, titles, segments) as JSON
    Get {
        /// Page path: module/chapter/page.md
        page: String,
    },
    /// Replace a page body
    Put {
        /// Page path: module/chapter/page.md
        page: String,
        /// File holding the new body (defaults to stdin)
        #[arg(long)]
        file: Option<String>,
    },
    /// Generate text for the segments of a page and save it
    Process {
        /// Page path: module/chapter/page.md
        page: String,
        /// Only process this segment index
        #[arg(long)]
        index: Option<usize>,
        /// File whose text is used as context instead of the page body
        #[arg(long)]
        context_file: Option<String>,
        /// Only include these memory files (repeatable)
        #[arg(long = "memory")]
        memory: Vec<String>,
    },
    /// Create a module
    CreateModule {
        /// Module title
        title: String,
    },
    /// Create a chapter inside a module
    CreateChapter {
        /// Module directory name
        module: String,
        /// Chapter title
        title: String,
    },
    /// Create a page inside a chapter
    CreatePage {
        /// Module directory name
        module: String,
        /// Chapter directory name
        chapter: String,
        /// Page title
        title: String,
        /// File holding the initial body
        #[arg(long)]
        file: Option<String>,
    },
    /// Retitle a module, chapter or page, keeping its order prefix
    Rename {
        /// Node kind: module, chapter or page
        kind: String,
        /// Path of the node relative to the content root
        path: String,
        /// New title
        title: String,
    },
    /// Renumber siblings in the given order
    Reorder {
        /// Node kind of the siblings: module, chapter or page
        kind: String,
        /// Parent path ("" for modules)
        #[arg(long, default_value = "")]
        parent: String,
        /// Every sibling name, in the new order
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete a module, chapter or page
    Delete {
        /// Node kind: module, chapter or page
        kind: String,
        /// Path of the node relative to the content root
        path: String,
    },
    /// Import a flat document with === / --- / +++ delimiters
    Import {
        /// Flat document to import ("-" reads stdin)
        file: String,
        /// Remove existing modules first
        #[arg(long)]
        clear: bool,
    },
    /// Export the tree as a flat document
    Export {
        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

// -----------------------------------------------------------------------
// Shared helpers
// -----------------------------------------------------------------------

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

/// Read a file, or stdin when `path` is `None` or `-`.
pub(crate) fn read_input(path: Option<&str>) -> anyhow::Result<String> {
    match path {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
        }
    }
}

fn cmd_init(config: &QuillConfig, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let written = config::save_config(&config.to_file())?;
    println!("Config written to {}", written.display());
    println!("  content root: {}", config.content_dir.display());
    println!("  memory dir:   {}", config.memory_dir.display());
    println!("  generator:    {}", config.claude_bin);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = CliOverrides {
        content_dir: cli.content_dir,
        memory_dir: cli.memory_dir,
        claude_bin: cli.claude_bin,
    };
    let config = QuillConfig::resolve(&overrides)?;
    tracing::debug!(
        content_dir = %config.content_dir.display(),
        memory_dir = %config.memory_dir.display(),
        claude_bin = %config.claude_bin,
        "resolved configuration"
    );

    match cli.command {
        Commands::Init { force } => cmd_init(&config, force),
        Commands::Parse { file } => document_cmds::cmd_parse(&file),
        Commands::Process {
            file,
            write,
            memory,
        } => document_cmds::cmd_process(&config, &file, write, &memory).await,
        Commands::Segment {
            file,
            index,
            within_chunk,
            write,
            memory,
        } => {
            document_cmds::cmd_segment(&config, &file, index, within_chunk, write, &memory).await
        }
        Commands::Memory { command } => match command {
            MemoryCommands::List => document_cmds::cmd_memory_list(&config),
            MemoryCommands::Save { name, file } => {
                document_cmds::cmd_memory_save(&config, &name, file.as_deref())
            }
            MemoryCommands::Rename { old, new } => {
                document_cmds::cmd_memory_rename(&config, &old, &new)
            }
            MemoryCommands::Delete { name } => document_cmds::cmd_memory_delete(&config, &name),
            MemoryCommands::Generate { name, description } => {
                document_cmds::cmd_memory_generate(&config, &name, &description).await
            }
        },
        Commands::Tree { command } => tree_cmds::run_tree_command(command, &config).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
