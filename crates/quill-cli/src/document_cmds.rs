//! CLI handlers for commands that work on a single markdown file.
//!
//! Implements:
//! - `quill parse <file>`                  -- segments and chunks as JSON
//! - `quill process <file> [--write]`      -- resolve every segment
//! - `quill segment <file> <index>`        -- resolve one segment
//! - `quill memory list`                   -- list the memory corpus
//! - `quill memory save|rename|delete`     -- manage memory files
//! - `quill memory generate <name> <desc>` -- write a memory file with the generator

use anyhow::{Context, Result};
use serde::Serialize;

use quill_core::generate::{
    ClaudeCodeGenerator, Memory, delete_memory, generate_memory, load_memory_dir, rename_memory,
    save_memory,
};
use quill_core::splice::{process_all, process_chunk_segment, process_segment};
use quill_core::{Chunk, Segment, extract, partition};

use crate::config::QuillConfig;
use crate::{print_json, read_input};

// -----------------------------------------------------------------------
// Shared setup
// -----------------------------------------------------------------------

pub(crate) fn generator(config: &QuillConfig) -> ClaudeCodeGenerator {
    ClaudeCodeGenerator::with_binary(config.claude_bin.clone())
}

/// Load the memory corpus, keeping only `selected` entries when any are named.
pub(crate) fn load_memory(config: &QuillConfig, selected: &[String]) -> Result<Memory> {
    let memory = load_memory_dir(&config.memory_dir).with_context(|| {
        format!(
            "failed to load memory from {}",
            config.memory_dir.display()
        )
    })?;
    select_memory(memory, selected)
}

/// Keep the named entries of `memory`. A name may omit the `.md` suffix.
/// An empty selection keeps everything.
fn select_memory(mut memory: Memory, selected: &[String]) -> Result<Memory> {
    if selected.is_empty() {
        return Ok(memory);
    }

    let mut chosen = Memory::new();
    let mut unknown = Vec::new();
    for name in selected {
        let key = if name.ends_with(".md") {
            name.clone()
        } else {
            format!("{name}.md")
        };
        match memory.remove(&key) {
            Some(body) => {
                chosen.insert(key, body);
            }
            None if chosen.contains_key(&key) => {}
            None => unknown.push(name.as_str()),
        }
    }

    if !unknown.is_empty() {
        anyhow::bail!("unknown memory file(s): {}", unknown.join(", "));
    }
    Ok(chosen)
}

fn write_back(file: &str, content: &str) -> Result<()> {
    std::fs::write(file, content).with_context(|| format!("failed to write {file}"))
}

fn check_writable(file: &str, write: bool) -> Result<()> {
    if write && file == "-" {
        anyhow::bail!("--write needs a file path, not stdin");
    }
    Ok(())
}

// -----------------------------------------------------------------------
// quill parse <file>
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct ParseOutput {
    segments: Vec<Segment>,
    chunks: Vec<Chunk>,
}

pub fn cmd_parse(file: &str) -> Result<()> {
    let document = read_input(Some(file))?;
    print_json(&ParseOutput {
        segments: extract(&document),
        chunks: partition(&document),
    })
}

// -----------------------------------------------------------------------
// quill process <file>
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct ProcessSummary<'a> {
    file: &'a str,
    processed: usize,
}

/// Resolve every segment. Without `--write` the new document goes to
/// stdout; with it the file is rewritten and a JSON summary is printed.
pub async fn cmd_process(
    config: &QuillConfig,
    file: &str,
    write: bool,
    selected: &[String],
) -> Result<()> {
    check_writable(file, write)?;
    let document = read_input(Some(file))?;
    let memory = load_memory(config, selected)?;

    let outcome = process_all(&document, &generator(config), &memory)
        .await
        .with_context(|| format!("failed to process {file}"))?;

    if write {
        write_back(file, &outcome.content)?;
        print_json(&ProcessSummary {
            file,
            processed: outcome.processed,
        })
    } else {
        print!("{}", outcome.content);
        Ok(())
    }
}

// -----------------------------------------------------------------------
// quill segment <file> <index>
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct SegmentSummary<'a> {
    file: &'a str,
    index: usize,
    replacement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_end_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunk_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_index: Option<usize>,
}

pub async fn cmd_segment(
    config: &QuillConfig,
    file: &str,
    index: usize,
    within_chunk: bool,
    write: bool,
    selected: &[String],
) -> Result<()> {
    check_writable(file, write)?;
    let document = read_input(Some(file))?;
    let memory = load_memory(config, selected)?;
    let generator = generator(config);

    let (content, summary) = if within_chunk {
        let outcome = process_chunk_segment(&document, index, &generator, &memory)
            .await
            .with_context(|| format!("failed to process segment {index} of {file}"))?;
        let summary = SegmentSummary {
            file,
            index,
            replacement: outcome.replacement,
            new_end_offset: None,
            chunk_id: Some(outcome.chunk_id),
            local_index: Some(outcome.local_index),
        };
        (outcome.content, summary)
    } else {
        let outcome = process_segment(&document, index, None, &generator, &memory)
            .await
            .with_context(|| format!("failed to process segment {index} of {file}"))?;
        let summary = SegmentSummary {
            file,
            index,
            replacement: outcome.replacement,
            new_end_offset: Some(outcome.new_end_offset),
            chunk_id: None,
            local_index: None,
        };
        (outcome.content, summary)
    };

    if write {
        write_back(file, &content)?;
        print_json(&summary)
    } else {
        print!("{content}");
        Ok(())
    }
}

// -----------------------------------------------------------------------
// quill memory list
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct MemoryEntry<'a> {
    name: &'a str,
    bytes: usize,
}

pub fn cmd_memory_list(config: &QuillConfig) -> Result<()> {
    let memory = load_memory(config, &[])?;
    let entries: Vec<MemoryEntry<'_>> = memory
        .iter()
        .map(|(name, body)| MemoryEntry {
            name,
            bytes: body.len(),
        })
        .collect();
    print_json(&entries)
}

// -----------------------------------------------------------------------
// quill memory save / rename / delete / generate
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct MemorySaved {
    name: String,
    bytes: usize,
}

#[derive(Serialize)]
struct MemoryGenerated {
    name: String,
}

#[derive(Serialize)]
struct MemoryRenamed<'a> {
    from: &'a str,
    name: String,
}

#[derive(Serialize)]
struct MemoryDeleted<'a> {
    name: &'a str,
}

pub fn cmd_memory_save(config: &QuillConfig, name: &str, file: Option<&str>) -> Result<()> {
    let content = read_input(file)?;
    let name = save_memory(&config.memory_dir, name, &content)
        .with_context(|| format!("failed to save memory file {name:?}"))?;
    print_json(&MemorySaved {
        name,
        bytes: content.len(),
    })
}

pub fn cmd_memory_rename(config: &QuillConfig, old: &str, new: &str) -> Result<()> {
    let name = rename_memory(&config.memory_dir, old, new)
        .with_context(|| format!("failed to rename memory file {old:?}"))?;
    print_json(&MemoryRenamed { from: old, name })
}

pub fn cmd_memory_delete(config: &QuillConfig, name: &str) -> Result<()> {
    delete_memory(&config.memory_dir, name)
        .with_context(|| format!("failed to delete memory file {name:?}"))?;
    print_json(&MemoryDeleted { name })
}

pub async fn cmd_memory_generate(
    config: &QuillConfig,
    name: &str,
    description: &str,
) -> Result<()> {
    let name = generate_memory(&config.memory_dir, name, description, &generator(config))
        .await
        .with_context(|| format!("failed to generate memory file {name:?}"))?;
    print_json(&MemoryGenerated { name })
}
