//! Prompt composition for the generation stages.
//!
//! Each stage prompt is the source document framed as authoritative, the
//! fixed policy blocks, an optional must-include list of coverage tokens,
//! and one stage instruction. Blocks are named constants so a change to one
//! is testable on its own.

use super::stage::Stage;

/// Placeholder the stages must emit for facts the source does not contain.
pub const UNKNOWN_PLACEHOLDER: &str = "[Unknown in source]";

pub const SECTION_POLICY: &str = "### SECTION POLICY
- Detect and preserve existing headings/sections and their order when clearly implied
  (e.g., Program Description, Program History, News Media Perspective, PEO POV,
  Chief Engineer Email, PAO Tasker/Media Qs, Deputy PM Advice, Assignment Questions, Exhibits).
- Do NOT add \"Recommendations\", \"Learning Outcomes\", or other sections unless they exist in the source.
- If front matter/disclaimer exists in the source, render it verbatim at the top.
";

pub const FACTUALITY_QUOTE_POLICY: &str = "### FACTUALITY & QUOTE POLICY
- Use ONLY facts present in the Uploaded Case Source.
- If a detail (number, date, outcome) is missing, write: [Unknown in source].
- Do NOT invent quotations. Only use direct quotes that appear verbatim in the source.
  Otherwise, paraphrase with attribution (e.g., According to CAPT Engdahl, ...).
";

pub const TIMELINE_ACCURACY: &str = "### TIMELINE ACCURACY
- Copy dates/events exactly as written in the source.
- Example: January 2010 = taxi testing (not first flight). First flight = February 4, 2011.
- If unsure, use [Unknown in source] rather than inferring.
";

/// Stage instruction appended after the policy blocks.
pub fn stage_instruction(stage: Stage) -> &'static str {
    match stage {
        Stage::Plan => {
            "PLAN: Output a concise, ordered plan (bullets) listing the section headers \
             you will render, preserving the source's order. No extra sections."
        }
        Stage::Draft => {
            "DRAFT: Write the case using the planned sections. Preserve any front matter \
             verbatim if present. Include Assignment Questions/Exhibits only if they exist \
             in the source. Do not add Learning Outcomes or synthetic conclusions. Where a \
             fact is missing, write [Unknown in source]."
        }
        Stage::Verify => {
            "VERIFY: Review the draft for (a) any invented numbers/outcomes/quotes and \
             (b) missing coverage of the MUST INCLUDE topics. Return ONLY a bullet list \
             of concrete fixes."
        }
        Stage::Finalize => {
            "FINALIZE: Apply the verifier's fixes and output ONLY the final case text. \
             No plan, no critique, no meta."
        }
    }
}

fn source_block(source_text: &str) -> String {
    format!(
        "### UPLOADED CASE SOURCE (authoritative)\n{source_text}\n\n\
         ### STYLE GUIDE (reference only)\n\
         Use this only for tone/clarity. Do NOT add sections that aren't present in the source unless asked."
    )
}

fn must_include_block(tokens: &[String]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    Some(format!(
        "### MUST INCLUDE (only if present in source)\n- {}",
        tokens.join("\n- ")
    ))
}

/// Build the full prompt for one stage.
///
/// Prior stage outputs are NOT inlined here; they ride to the backend as
/// structured context alongside the prompt.
pub fn compose(stage: Stage, source_text: &str, tokens: &[String]) -> String {
    let mut blocks = vec![source_block(source_text)];

    // The verifier reads against the draft, not the section layout.
    if stage != Stage::Verify {
        blocks.push(SECTION_POLICY.to_string());
    }
    blocks.push(FACTUALITY_QUOTE_POLICY.to_string());
    blocks.push(TIMELINE_ACCURACY.to_string());
    if let Some(block) = must_include_block(tokens) {
        blocks.push(block);
    }
    blocks.push(stage_instruction(stage).to_string());

    blocks.join("\n")
}
