//! Chunk partitioning: split a document into top-level sections.
//!
//! A line of the form `# Title` opens a new level-1 chunk. Every other line
//! belongs to the chunk that is currently open; lines before the first
//! heading form a level-0 "Preamble" chunk. Deeper headings (`##`, `###`)
//! never split.
//!
//! Concatenating every chunk's `content` in order gives back the source
//! document byte for byte.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static PRIMARY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+(\S.*)$").expect("primary heading pattern"));

/// Title given to the chunk holding lines before the first heading.
pub const PREAMBLE_TITLE: &str = "Preamble";

/// A heading-delimited section of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Sequential id in discovery order, starting at 0.
    pub id: usize,
    pub title: String,
    /// 0 for the preamble, 1 for a `#` heading chunk.
    pub level: u8,
    pub content: String,
    /// First line of the chunk (0-based, inclusive).
    pub start_line: usize,
    /// Last line of the chunk (0-based, inclusive).
    pub end_line: usize,
    /// Byte offset of the chunk's first character in the source document.
    pub start_offset: usize,
}

impl Chunk {
    /// Byte offset just past the chunk's last character.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.content.len()
    }

    pub fn is_preamble(&self) -> bool {
        self.level == 0
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start_offset <= offset && offset < self.end_offset()
    }
}

/// Split `document` into chunks.
pub fn partition(document: &str) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Option<Chunk> = None;
    let mut offset = 0usize;

    for (line_no, line) in document.split_inclusive('\n').enumerate() {
        if let Some(title) = heading_title(line) {
            if let Some(done) = current.take() {
                chunks.push(done);
            }
            current = Some(Chunk {
                id: chunks.len(),
                title: title.to_string(),
                level: 1,
                content: line.to_string(),
                start_line: line_no,
                end_line: line_no,
                start_offset: offset,
            });
        } else {
            match current.as_mut() {
                Some(chunk) => {
                    chunk.content.push_str(line);
                    chunk.end_line = line_no;
                }
                None => {
                    current = Some(Chunk {
                        id: 0,
                        title: PREAMBLE_TITLE.to_string(),
                        level: 0,
                        content: line.to_string(),
                        start_line: line_no,
                        end_line: line_no,
                        start_offset: offset,
                    });
                }
            }
        }
        offset += line.len();
    }

    if let Some(done) = current {
        chunks.push(done);
    }

    chunks
}

/// Return the heading text if `line` opens a level-1 chunk.
fn heading_title(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    PRIMARY_HEADING
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end())
}

/// 0-based line number containing the byte at `offset`.
pub fn line_of_offset(document: &str, offset: usize) -> usize {
    let end = offset.min(document.len());
    document.as_bytes()[..end]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

/// Find the chunk whose inclusive line range contains `line`.
pub fn chunk_for_line(chunks: &[Chunk], line: usize) -> Option<&Chunk> {
    chunks.iter().find(|c| c.contains_line(line))
}

/// Find the chunk containing the byte at `offset` of the partitioned document.
pub fn chunk_for_offset(chunks: &[Chunk], offset: usize) -> Option<&Chunk> {
    chunks.iter().find(|c| c.contains_offset(offset))
}
