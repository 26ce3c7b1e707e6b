//! Source document parsing (PDF and plain text).
//!
//! Turns a raw downloaded file into one flat text string: per-page PDF text
//! or UTF-8 file content, with every whitespace run collapsed to a single
//! space. Callers treat a parse failure and an empty result identically;
//! both mean "skip this file".

use std::path::Path;

/// Parse failure. Unsupported extensions are an explicit outcome, not a
/// panic; extraction failures never yield a partial result.
#[derive(Debug)]
pub enum ParseError {
    Unsupported(String),
    Pdf(String),
    Io(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Unsupported(ext) => write!(f, "unsupported file extension: .{}", ext),
            ParseError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ParseError::Io(e) => write!(f, "failed to read file: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

/// Extract the full text of a source document as one whitespace-normalized
/// string.
pub fn parse_document(path: &Path) -> Result<String, ParseError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let raw = match ext.as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| ParseError::Pdf(e.to_string()))?,
        "txt" => std::fs::read_to_string(path).map_err(|e| ParseError::Io(e.to_string()))?,
        other => return Err(ParseError::Unsupported(other.to_string())),
    };

    Ok(collapse_whitespace(&raw))
}

/// Collapse all runs of whitespace (including page-break newlines) to single
/// spaces, producing a flat string with no paragraph structure.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
