use std::path::Path;

use serde::{Deserialize, Serialize};

use super::docx::DocxSourceExtractor;
use super::pdf::PdfSourceExtractor;
use super::ExtractionError;

/// Source document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Text,
}

impl SourceFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &str) -> Result<Self, ExtractionError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" | "md" => Ok(Self::Text),
            _ => Err(ExtractionError::UnsupportedFormat(path.to_string())),
        }
    }
}

/// Text extraction abstraction (allows mocking)
pub trait TextExtractor {
    fn extract(&self, bytes: &[u8], format: SourceFormat) -> Result<String, ExtractionError>;
}

/// Production extractor dispatching on the detected format.
pub struct DocumentTextExtractor {
    pdf: PdfSourceExtractor,
    docx: DocxSourceExtractor,
}

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self {
            pdf: PdfSourceExtractor,
            docx: DocxSourceExtractor,
        }
    }
}

impl Default for DocumentTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for DocumentTextExtractor {
    fn extract(&self, bytes: &[u8], format: SourceFormat) -> Result<String, ExtractionError> {
        match format {
            SourceFormat::Pdf => self.pdf.extract(bytes),
            SourceFormat::Docx => self.docx.extract(bytes),
            SourceFormat::Text => String::from_utf8(bytes.to_vec())
                .map_err(|e| ExtractionError::EncodingError(e.to_string())),
        }
    }
}
