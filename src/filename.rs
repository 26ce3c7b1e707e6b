//! Filename metadata extraction.
//!
//! Source files follow the convention
//! `<TICKER>_<TAG>[_<AGENCY>]_<DATECODE>.<pdf|txt>` with
//! TAG ∈ {AR, CR, Concall, PPT} and DATECODE ∈ {YYYY, YYYYMM, YYYYMMDD}.
//! Annual reports may also use the short two-token form `<TICKER>_<YYYY>`.
//! Everything the pipeline knows about a file before parsing it (entity
//! ticker, document type, report date) comes from here.

use chrono::NaiveDate;

use crate::models::{DocumentType, FileMeta};

/// Why a filename was not accepted. The two variants are handled differently
/// by the orchestrator: a malformed name is warned about, an extension
/// mismatch ("right name, wrong file kind") is skipped quietly.
#[derive(Debug)]
pub enum MetaError {
    Malformed(String),
    ExtensionMismatch {
        doc_type: DocumentType,
        ext: String,
    },
}

impl std::fmt::Display for MetaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaError::Malformed(reason) => write!(f, "malformed filename: {}", reason),
            MetaError::ExtensionMismatch { doc_type, ext } => {
                write!(f, "extension .{} does not match document type {}", ext, doc_type)
            }
        }
    }
}

impl std::error::Error for MetaError {}

/// Derive ticker, document type, and report date from a source filename.
pub fn extract_metadata(filename: &str) -> Result<FileMeta, MetaError> {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext.to_ascii_lowercase()),
        None => (filename, String::new()),
    };

    let tokens: Vec<&str> = stem.split('_').collect();

    let (ticker, doc_type, datecode) = match tokens.as_slice() {
        [] | [_] => {
            return Err(MetaError::Malformed(
                "expected at least <TICKER>_<YEAR> or <TICKER>_<TAG>_<DATECODE>".to_string(),
            ))
        }
        // Short annual-report form: RELIANCE_2024.pdf
        [ticker, year] => {
            if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
                (*ticker, DocumentType::AnnualReport, *year)
            } else {
                return Err(MetaError::Malformed(format!(
                    "two-token name requires a 4-digit year, got '{}'",
                    year
                )));
            }
        }
        // General form: the second token is the type tag, the last the datecode.
        [ticker, tag, .., datecode] => (*ticker, DocumentType::from_tag(tag), *datecode),
    };

    if !extension_allowed(doc_type, &ext) {
        return Err(MetaError::ExtensionMismatch { doc_type, ext });
    }

    Ok(FileMeta {
        ticker: ticker.to_string(),
        doc_type,
        report_date: parse_datecode(datecode),
    })
}

/// Annual reports, transcripts, and PPTs are always PDFs; credit ratings may
/// arrive as PDF or plain text. Unknown types are left for the parser to gate.
fn extension_allowed(doc_type: DocumentType, ext: &str) -> bool {
    match doc_type {
        DocumentType::AnnualReport
        | DocumentType::ConcallTranscript
        | DocumentType::ConcallPpt => ext == "pdf",
        DocumentType::CreditRating => ext == "pdf" || ext == "txt",
        DocumentType::Unknown => true,
    }
}

/// Parse a datecode token by length: a bare year resolves to March 31 (the
/// fiscal-year end), YYYYMMDD to the exact day, YYYYMM to the first of the
/// month. Anything else (wrong length, non-digits, an impossible date)
/// yields no report date rather than a rejection.
fn parse_datecode(datecode: &str) -> Option<NaiveDate> {
    if datecode.is_empty() || !datecode.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    match datecode.len() {
        4 => {
            let year: i32 = datecode.parse().ok()?;
            NaiveDate::from_ymd_opt(year, 3, 31)
        }
        8 => NaiveDate::parse_from_str(datecode, "%Y%m%d").ok(),
        6 => {
            let year: i32 = datecode[..4].parse().ok()?;
            let month: u32 = datecode[4..].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        _ => None,
    }
}
