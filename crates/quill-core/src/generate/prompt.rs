//! Prompt assembly for command-line generators.

use super::GenerationRequest;
use crate::segment::SegmentKind;

const OUTPUT_RULES: &str = "Return ONLY the generated content as plain text. \
Do NOT write to files, do NOT execute commands. \
You MAY use web search if needed to gather information. \
Just output the text content directly.";

/// Build the full prompt text sent to the generator.
///
/// Sections appear in a fixed order: memory files, surrounding context, the
/// task, then output rules. Empty sections are left out.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut out = String::new();

    if !request.memory.is_empty() {
        out.push_str("# Memory Context\n\n");
        for (name, body) in &request.memory {
            out.push_str(&format!("## {name}\n\n{}\n\n", body.trim_end()));
        }
        out.push_str("---\n\n");
    }

    if let Some(context) = request.context.as_deref().filter(|c| !c.trim().is_empty()) {
        out.push_str("# Current Section Context\n\n");
        out.push_str(context.trim_end());
        out.push_str("\n\n---\n\n");
    }

    out.push_str("# Task\n\n");
    out.push_str(&request.prompt);
    out.push_str("\n\n");
    if let Some(hint) = kind_hint(request.kind) {
        out.push_str(hint);
        out.push_str("\n\n");
    }

    out.push_str("---\n\n# Important Instructions\n\n");
    out.push_str(OUTPUT_RULES);
    out.push('\n');
    out
}

fn kind_hint(kind: SegmentKind) -> Option<&'static str> {
    match kind {
        SegmentKind::Prompt => None,
        SegmentKind::Research => Some(
            "Research this topic before writing. Prefer current, verifiable facts and \
             mention where they come from.",
        ),
        SegmentKind::Autoprompt => Some(
            "The task above is a brief. Expand it into a complete writing prompt \
             for this section, then write the content that prompt asks for.",
        ),
    }
}
