//! Deterministic post-generation cleanup.
//!
//! Upstream stages are instructed not to invent sections, quotes, or dates;
//! this pass enforces those rules on whatever text actually came back. Pure
//! string work against the source document, no model calls, idempotent.

use std::sync::LazyLock;

use regex::Regex;

use super::coverage::{Correction, RuleSet};

static QUOTED_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[“"]([^”"]+)[”"]"#).expect("valid regex"));

/// Sanitize a candidate case text against its source document.
pub fn sanitize_case_output(source_text: &str, candidate: &str) -> String {
    sanitize_with_corrections(source_text, candidate, RuleSet::embedded().corrections())
}

/// Sanitize with an explicit correction table (for alternative rule files).
pub fn sanitize_with_corrections(
    source_text: &str,
    candidate: &str,
    corrections: &[Correction],
) -> String {
    let mut out = candidate.to_string();

    // 1) A "Recommendations" section the source never had is an invention.
    if !contains_ignore_case(source_text, "recommendations") {
        out = strip_recommendations_blocks(&out);
    }

    // 2) Quotes that are not verbatim in the source become plain paraphrase.
    out = neutralize_unsourced_quotes(source_text, &out);

    // 3) Known literal corrections (e.g. a date/event conflation the model
    //    keeps reproducing). Domain-specific patch data, not a general rule.
    for correction in corrections {
        out = out.replace(&correction.find, &correction.replace);
    }

    out
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A line that reads as a "Recommendations" heading: optionally marked up
/// with markdown #'s or bold markers.
fn is_recommendations_heading(line: &str) -> bool {
    let t = line
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim();
    t.eq_ignore_ascii_case("recommendations")
}

/// A line that plausibly starts a new top-level section.
fn is_heading_like(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with('#')
        || t.chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false)
}

/// Remove every block that starts with a "Recommendations" heading, through
/// the text up to (but not including) the next top-level heading (an empty
/// line followed by a heading-like line, or a markdown heading) or end of
/// text.
fn strip_recommendations_blocks(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut kept: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if is_recommendations_heading(lines[i]) {
            i += 1;
            let mut consumed = 0;
            while i < lines.len() {
                let at_markdown_heading = lines[i].trim_start().starts_with('#');
                // The blank line right under the heading belongs to the
                // block; boundary hunting starts after the first body line.
                let at_blank_boundary = consumed > 0
                    && lines[i].trim().is_empty()
                    && lines.get(i + 1).map(|l| is_heading_like(l)).unwrap_or(false);
                if at_markdown_heading || at_blank_boundary {
                    break;
                }
                i += 1;
                consumed += 1;
            }
            continue;
        }
        kept.push(lines[i]);
        i += 1;
    }

    let mut out = kept.join("\n");
    if text.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Strip the quotation marks from every quoted span whose content does not
/// occur verbatim (case-insensitively) in the source, leaving the content in
/// place as plain text.
fn neutralize_unsourced_quotes(source_text: &str, text: &str) -> String {
    let source_lower = source_text.to_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for captures in QUOTED_SPAN_RE.captures_iter(text) {
        let whole = captures.get(0).expect("match");
        let inner = captures.get(1).expect("capture group").as_str();
        let trimmed = inner.trim();
        if !trimmed.is_empty() && !source_lower.contains(&trimmed.to_lowercase()) {
            out.push_str(&text[last..whole.start()]);
            out.push_str(inner);
            last = whole.end();
        }
    }
    out.push_str(&text[last..]);
    out
}
