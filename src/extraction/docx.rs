use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionError;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// DOCX text extractor.
///
/// A .docx file is a zip container; the document body lives in
/// `word/document.xml`. Markup is stripped to one line per paragraph.
pub struct DocxSourceExtractor;

impl DocxSourceExtractor {
    pub fn extract(&self, docx_bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(docx_bytes))
            .map_err(|e| ExtractionError::DocxParsing(e.to_string()))?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractionError::DocxParsing(format!("word/document.xml: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;

        Ok(paragraphs_from_xml(&xml))
    }
}

/// Flatten WordprocessingML into plain text, one paragraph per line.
fn paragraphs_from_xml(xml: &str) -> String {
    let mut paragraphs = Vec::new();
    for chunk in xml.split("</w:p>") {
        let stripped = TAG_RE.replace_all(chunk, "");
        let text = decode_entities(stripped.trim());
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }
    paragraphs.join("\n")
}

fn decode_entities(text: &str) -> String {
    // &amp; last so already-escaped entities decode exactly once
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
