//! Splicing generated text back over task markers.
//!
//! Segment offsets are only valid against the exact text they were
//! extracted from. [`splice_all`] therefore applies edits from the highest
//! start offset downward, so replacing one block never shifts a block that
//! is still waiting to be replaced.

mod process;

use thiserror::Error;

pub use process::{
    ChunkSegmentOutcome, ProcessOutcome, SegmentOutcome, process_all, process_chunk_segment,
    process_page, process_segment,
};

use crate::generate::GenerationError;
use crate::segment::{self, Segment};
use crate::tree::TreeError;

#[derive(Debug, Error)]
pub enum SpliceError {
    #[error("segment index {index} out of range ({count} segments)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("got {replacements} replacements for {segments} segments")]
    ReplacementCountMismatch { segments: usize, replacements: usize },

    /// A segment's range does not fit the text or overlaps another one.
    #[error("segment {index} range {start}..{end} is not valid for this text")]
    InvalidRange {
        index: usize,
        start: usize,
        end: usize,
    },

    /// The segment located in the document has no chunk around it.
    #[error("segment {index} does not fall inside any chunk")]
    SegmentOutsideChunk { index: usize },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A replacement waiting to be applied to the text `segment` came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub segment: Segment,
    pub replacement: String,
}

/// Result of [`splice_one`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOutcome {
    pub content: String,
    /// The segment that was replaced, as it was located before the edit.
    pub segment: Segment,
    /// Byte offset just past the inserted replacement.
    pub new_end_offset: usize,
}

/// Replace every segment with its replacement, pairing them by position.
///
/// `segments` must come from `document` itself. Zero segments with zero
/// replacements returns the document unchanged.
pub fn splice_all<S: AsRef<str>>(
    document: &str,
    segments: &[Segment],
    replacements: &[S],
) -> Result<String, SpliceError> {
    if segments.len() != replacements.len() {
        return Err(SpliceError::ReplacementCountMismatch {
            segments: segments.len(),
            replacements: replacements.len(),
        });
    }

    let edits = segments
        .iter()
        .zip(replacements)
        .map(|(segment, replacement)| PendingEdit {
            segment: segment.clone(),
            replacement: replacement.as_ref().to_string(),
        })
        .collect();
    apply_edits(document, edits)
}

/// Apply edits in descending start-offset order.
///
/// Ranges must lie inside `document` on `char` boundaries and must not
/// overlap one another.
pub fn apply_edits(document: &str, mut edits: Vec<PendingEdit>) -> Result<String, SpliceError> {
    edits.sort_by(|a, b| b.segment.start_offset.cmp(&a.segment.start_offset));

    let mut out = document.to_string();
    let mut limit = document.len();
    for edit in &edits {
        let seg = &edit.segment;
        let in_bounds = seg.start_offset <= seg.end_offset
            && seg.end_offset <= limit
            && document.is_char_boundary(seg.start_offset)
            && document.is_char_boundary(seg.end_offset);
        if !in_bounds {
            return Err(SpliceError::InvalidRange {
                index: seg.index,
                start: seg.start_offset,
                end: seg.end_offset,
            });
        }
        out.replace_range(seg.start_offset..seg.end_offset, &edit.replacement);
        limit = seg.start_offset;
    }
    Ok(out)
}

/// Re-extract segments from `text` and replace the one at `index`.
///
/// Only that segment changes; everything before and after it is kept as-is.
pub fn splice_one(text: &str, index: usize, replacement: &str) -> Result<SpliceOutcome, SpliceError> {
    let segments = segment::extract(text);
    let segment = segments
        .get(index)
        .cloned()
        .ok_or(SpliceError::IndexOutOfRange {
            index,
            count: segments.len(),
        })?;

    let mut content = String::with_capacity(text.len() - segment.len() + replacement.len());
    content.push_str(&text[..segment.start_offset]);
    content.push_str(replacement);
    content.push_str(&text[segment.end_offset..]);

    Ok(SpliceOutcome {
        new_end_offset: segment.start_offset + replacement.len(),
        content,
        segment,
    })
}
