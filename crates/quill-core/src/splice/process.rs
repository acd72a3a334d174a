use serde::Serialize;
use tracing::{debug, info};

use super::{SpliceError, splice_all, splice_one};
use crate::chunk::{self, Chunk};
use crate::generate::{GenerationRequest, Generator, Memory};
use crate::segment::{self, Segment};
use crate::tree::{ContentTree, PageRef, marker};

/// Result of processing every segment of a text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub content: String,
    /// Number of segments replaced.
    pub processed: usize,
}

/// Result of processing one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentOutcome {
    pub content: String,
    pub segment: Segment,
    pub replacement: String,
    /// Byte offset just past the inserted replacement.
    pub new_end_offset: usize,
}

/// Result of processing one segment with only its chunk as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkSegmentOutcome {
    /// The whole document with the chunk rewritten.
    pub content: String,
    pub chunk_id: usize,
    /// The rewritten chunk alone.
    pub chunk_content: String,
    /// Index of the segment among the segments of its chunk.
    pub local_index: usize,
    pub segment: Segment,
    pub replacement: String,
}

fn request(segment: &Segment, context: &str, memory: &Memory) -> GenerationRequest {
    GenerationRequest::new(segment.prompt_text.clone(), segment.kind)
        .with_context(context)
        .with_memory(memory.clone())
}

/// Generate a replacement for every segment, then splice them all in.
///
/// Segments and chunks come from one snapshot of `document`. The generator
/// is called once per segment, last segment first, with the segment's
/// chunk as context. If any call fails, nothing is spliced and the error
/// is returned.
pub async fn process_all(
    document: &str,
    generator: &dyn Generator,
    memory: &Memory,
) -> Result<ProcessOutcome, SpliceError> {
    let segments = segment::extract(document);
    let chunks = chunk::partition(document);
    let mut replacements = vec![String::new(); segments.len()];

    for seg in segments.iter().rev() {
        let context = chunk::chunk_for_offset(&chunks, seg.start_offset)
            .map_or(document, |c| c.content.as_str());
        replacements[seg.index] = generator.generate(&request(seg, context, memory)).await?;
        debug!(
            generator = generator.name(),
            index = seg.index,
            kind = %seg.kind,
            total = segments.len(),
            "generated segment"
        );
    }

    let content = splice_all(document, &segments, &replacements)?;
    info!(
        generator = generator.name(),
        processed = segments.len(),
        "processed all segments"
    );
    Ok(ProcessOutcome {
        content,
        processed: segments.len(),
    })
}

/// Generate and splice the segment at `index` of `content`.
///
/// Segments are re-extracted from `content`, so `index` is always checked
/// against the current text. `context` defaults to `content` itself.
pub async fn process_segment(
    content: &str,
    index: usize,
    context: Option<&str>,
    generator: &dyn Generator,
    memory: &Memory,
) -> Result<SegmentOutcome, SpliceError> {
    let segments = segment::extract(content);
    let seg = segments.get(index).ok_or(SpliceError::IndexOutOfRange {
        index,
        count: segments.len(),
    })?;

    let replacement = generator
        .generate(&request(seg, context.unwrap_or(content), memory))
        .await?;
    let outcome = splice_one(content, index, &replacement)?;
    info!(generator = generator.name(), index, kind = %seg.kind, "processed segment");

    Ok(SegmentOutcome {
        content: outcome.content,
        segment: outcome.segment,
        replacement,
        new_end_offset: outcome.new_end_offset,
    })
}

/// Generate the segment at document-wide `index` using only its enclosing
/// chunk as context, and splice it into that chunk.
///
/// The rest of the document is carried over unchanged.
pub async fn process_chunk_segment(
    document: &str,
    index: usize,
    generator: &dyn Generator,
    memory: &Memory,
) -> Result<ChunkSegmentOutcome, SpliceError> {
    let segments = segment::extract(document);
    let seg = segments.get(index).ok_or(SpliceError::IndexOutOfRange {
        index,
        count: segments.len(),
    })?;

    let chunks = chunk::partition(document);
    let (chunk, local_index) =
        locate_in_chunk(&chunks, seg).ok_or(SpliceError::SegmentOutsideChunk { index })?;

    let replacement = generator
        .generate(&request(seg, &chunk.content, memory))
        .await?;
    let outcome = splice_one(&chunk.content, local_index, &replacement)?;

    let mut content = String::with_capacity(document.len() + replacement.len());
    content.push_str(&document[..chunk.start_offset]);
    content.push_str(&outcome.content);
    content.push_str(&document[chunk.end_offset()..]);

    info!(
        generator = generator.name(),
        index,
        chunk = chunk.id,
        chunk_title = %chunk.title,
        local_index,
        "processed segment within chunk"
    );
    Ok(ChunkSegmentOutcome {
        content,
        chunk_id: chunk.id,
        chunk_content: outcome.content,
        local_index,
        segment: seg.clone(),
        replacement,
    })
}

/// Find the chunk holding `seg` and the segment's index within that chunk's
/// own text. `None` when the block crosses a chunk boundary.
fn locate_in_chunk<'a>(chunks: &'a [Chunk], seg: &Segment) -> Option<(&'a Chunk, usize)> {
    let chunk = chunk::chunk_for_offset(chunks, seg.start_offset)?;
    if seg.end_offset > chunk.end_offset() {
        return None;
    }
    let local_start = seg.start_offset - chunk.start_offset;
    let local = segment::extract(&chunk.content)
        .into_iter()
        .find(|s| s.start_offset == local_start)?;
    Some((chunk, local.index))
}

/// Process one segment of a stored page, or all of them when `index` is
/// `None`, and write the result back under the page's title marker.
///
/// A single segment uses `context` when given and the page body otherwise.
pub async fn process_page(
    tree: &ContentTree,
    page: &PageRef,
    index: Option<usize>,
    context: Option<&str>,
    generator: &dyn Generator,
    memory: &Memory,
) -> Result<ProcessOutcome, SpliceError> {
    let view = tree.get_page(page)?;

    let outcome = match index {
        Some(index) => {
            let done = process_segment(&view.content, index, context, generator, memory).await?;
            ProcessOutcome {
                content: done.content,
                processed: 1,
            }
        }
        None => process_all(&view.content, generator, memory).await?,
    };

    // Generated text may itself open with a marker-like line, so the page's
    // own titles are written back explicitly.
    tree.put_page(page, &marker::with_marker(&view.titles, &outcome.content))?;
    info!(page = %page.rel_path(), processed = outcome.processed, "updated page");
    Ok(outcome)
}
