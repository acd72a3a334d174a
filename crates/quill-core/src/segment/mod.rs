//! Segment extraction: find `<agent>` task markers in a document.
//!
//! A task marker is a delimiter block wrapping exactly one recognised inner
//! marker:
//!
//! ```text
//! <agent><prompt>Write an intro</prompt></agent>
//! <agent><autoprompt>brief</autoprompt></agent>
//! <agent><research>What changed in 2024?</research></agent>
//! ```
//!
//! Blocks are matched non-greedily and scanning resumes after each match, so
//! segments come out in ascending, non-overlapping offset order. Offsets are
//! byte offsets into the scanned text and always sit on `char` boundaries:
//! `&document[s.start_offset..s.end_offset]` is the whole marker block.
//!
//! Segments are never stored. Callers recompute them from the current text.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static AGENT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<agent>(.*?)</agent>").expect("agent block pattern"));

static RESEARCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<research>(.*?)</research>").expect("research pattern"));

static AUTOPROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<autoprompt>(.*?)</autoprompt>").expect("autoprompt pattern")
});

static PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<prompt>(.*?)</prompt>").expect("prompt pattern"));

/// Which inner marker a segment was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Prompt,
    Autoprompt,
    Research,
}

impl SegmentKind {
    /// Inner markers in the order they are tried. The first one present in
    /// a block wins and the rest are ignored.
    const PRIORITY: [SegmentKind; 3] = [
        SegmentKind::Research,
        SegmentKind::Autoprompt,
        SegmentKind::Prompt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Autoprompt => "autoprompt",
            Self::Research => "research",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Prompt => &*PROMPT,
            Self::Autoprompt => &*AUTOPROMPT,
            Self::Research => &*RESEARCH,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(Self::Prompt),
            "autoprompt" => Ok(Self::Autoprompt),
            "research" => Ok(Self::Research),
            other => Err(format!(
                "unknown segment kind {other:?} (expected prompt, autoprompt, or research)"
            )),
        }
    }
}

/// One task marker occurrence, resolved against a single snapshot of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Position among the segments of the scanned text, starting at 0.
    pub index: usize,
    pub kind: SegmentKind,
    /// Trimmed text of the winning inner marker.
    #[serde(rename = "prompt")]
    pub prompt_text: String,
    /// Byte offset of the `<agent>` opening tag.
    pub start_offset: usize,
    /// Byte offset just past the `</agent>` closing tag.
    pub end_offset: usize,
    /// Raw text between `<agent>` and `</agent>`.
    pub block: String,
}

impl Segment {
    /// Length in bytes of the marker block this segment covers.
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract every task marker segment from `document`.
///
/// Blocks with none of the three recognised inner markers are skipped and
/// do not consume an index.
pub fn extract(document: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for caps in AGENT_BLOCK.captures_iter(document) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let block = inner.as_str();

        let Some((kind, text)) = resolve_inner(block) else {
            continue;
        };

        segments.push(Segment {
            index: segments.len(),
            kind,
            prompt_text: text.trim().to_string(),
            start_offset: whole.start(),
            end_offset: whole.end(),
            block: block.to_string(),
        });
    }

    segments
}

/// Count segments without keeping them.
pub fn count(document: &str) -> usize {
    extract(document).len()
}

fn resolve_inner(block: &str) -> Option<(SegmentKind, &str)> {
    SegmentKind::PRIORITY.into_iter().find_map(|kind| {
        kind.pattern()
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| (kind, m.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_no_segments() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn extracts_single_prompt() {
        let doc = "Intro\n<agent><prompt>  Write a summary \n</prompt></agent>\nOutro";
        let segments = extract(doc);

        assert_eq!(segments.len(), 1);
        let seg = &segments[0];
        assert_eq!(seg.index, 0);
        assert_eq!(seg.kind, SegmentKind::Prompt);
        assert_eq!(seg.prompt_text, "Write a summary");
        assert_eq!(
            &doc[seg.start_offset..seg.end_offset],
            "<agent><prompt>  Write a summary \n</prompt></agent>"
        );
    }

    #[test]
    fn research_beats_prompt() {
        let segments = extract("<agent><prompt>A</prompt><research>B</research></agent>");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Research);
        assert_eq!(segments[0].prompt_text, "B");
    }

    #[test]
    fn autoprompt_beats_prompt_but_not_research() {
        let segments = extract("<agent><prompt>A</prompt><autoprompt>C</autoprompt></agent>");
        assert_eq!(segments[0].kind, SegmentKind::Autoprompt);
        assert_eq!(segments[0].prompt_text, "C");

        let segments = extract(
            "<agent><autoprompt>C</autoprompt><research>B</research><prompt>A</prompt></agent>",
        );
        assert_eq!(segments[0].kind, SegmentKind::Research);
        assert_eq!(segments[0].prompt_text, "B");
    }

    #[test]
    fn block_without_inner_marker_is_skipped() {
        let doc = "<agent>just notes</agent> then <agent><prompt>real</prompt></agent>";
        let segments = extract(doc);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[0].prompt_text, "real");
    }

    #[test]
    fn blocks_span_newlines_and_stay_ordered() {
        let doc = "# Title\n<agent>\n<prompt>\nfirst\n</prompt>\n</agent>\n\
                   text\n<agent><research>second</research></agent>\n";
        let segments = extract(doc);

        assert_eq!(segments.len(), 2);
        assert!(segments[0].end_offset <= segments[1].start_offset);
        assert_eq!(segments[0].prompt_text, "first");
        assert_eq!(segments[1].prompt_text, "second");
        for seg in &segments {
            let slice = &doc[seg.start_offset..seg.end_offset];
            assert!(slice.starts_with("<agent>") && slice.ends_with("</agent>"));
        }
    }

    #[test]
    fn offsets_are_stable_across_parses() {
        let doc = "α <agent><prompt>ü</prompt></agent> β <agent><prompt>x</prompt></agent>";
        assert_eq!(extract(doc), extract(doc));
    }

    #[test]
    fn offsets_respect_multibyte_text() {
        let doc = "héllo <agent><prompt>p</prompt></agent>";
        let seg = &extract(doc)[0];
        assert_eq!(seg.start_offset, "héllo ".len());
        assert_eq!(&doc[seg.start_offset..seg.end_offset], "<agent><prompt>p</prompt></agent>");
    }

    #[test]
    fn unterminated_block_is_not_a_segment() {
        assert!(extract("<agent><prompt>dangling</prompt>").is_empty());
    }

    #[test]
    fn segment_kind_round_trips_through_str() {
        for kind in SegmentKind::PRIORITY {
            assert_eq!(kind.as_str().parse::<SegmentKind>().unwrap(), kind);
        }
        assert!("summary".parse::<SegmentKind>().is_err());
    }
}
