//! Core data types used throughout Finsight.
//!
//! These types represent the documents, chunks, and retrieval queries that
//! flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, NaiveDate, Utc};

use crate::chunk::chunk_hash;

/// Document category derived from the type tag in a source filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    AnnualReport,
    CreditRating,
    ConcallTranscript,
    ConcallPpt,
    Unknown,
}

impl DocumentType {
    /// Map a filename type tag (`AR`, `CR`, `Concall`, `PPT`) to a type.
    /// Unrecognized tags map to [`DocumentType::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "AR" => DocumentType::AnnualReport,
            "CR" => DocumentType::CreditRating,
            "Concall" => DocumentType::ConcallTranscript,
            "PPT" => DocumentType::ConcallPpt,
            _ => DocumentType::Unknown,
        }
    }

    /// Canonical display string, also the value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::AnnualReport => "Annual Report",
            DocumentType::CreditRating => "Credit Rating",
            DocumentType::ConcallTranscript => "Concall Transcript",
            DocumentType::ConcallPpt => "Concall PPT",
            DocumentType::Unknown => "Unknown",
        }
    }

    /// Parse a canonical display string back into a concrete type.
    ///
    /// Returns `None` for anything that is not one of the four concrete
    /// labels. `"Unknown"` in particular is never a useful filter.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label {
            "Annual Report" => Some(DocumentType::AnnualReport),
            "Credit Rating" => Some(DocumentType::CreditRating),
            "Concall Transcript" => Some(DocumentType::ConcallTranscript),
            "Concall PPT" => Some(DocumentType::ConcallPpt),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata derived from a source filename before any parsing happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub ticker: String,
    pub doc_type: DocumentType,
    pub report_date: Option<NaiveDate>,
}

/// An embedded slice of a source document, the unit of storage and retrieval.
///
/// Uniqueness is enforced on `(security_id, document_type, source_url,
/// chunk_hash)`: identical text from the same source is never duplicated,
/// while the same text from two different sources is stored separately.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub security_id: i64,
    pub document_type: DocumentType,
    pub source_url: String,
    pub report_date: Option<NaiveDate>,
    pub chunk_text: String,
    pub embedding: Vec<f32>,
    pub chunk_hash: String,
}

impl DocumentChunk {
    /// Build a chunk record, deriving the content hash from the chunk text.
    pub fn new(
        security_id: i64,
        document_type: DocumentType,
        source_url: String,
        report_date: Option<NaiveDate>,
        chunk_text: String,
        embedding: Vec<f32>,
    ) -> Self {
        let chunk_hash = chunk_hash(&chunk_text);
        Self {
            security_id,
            document_type,
            source_url,
            report_date,
            chunk_text,
            embedding,
            chunk_hash,
        }
    }
}

/// Result of an idempotent chunk upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyExisted,
}

/// A chunk returned from retrieval, with its distance to the query vector.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_text: String,
    pub document_type: DocumentType,
    pub source_url: String,
    pub report_date: Option<NaiveDate>,
    pub distance: f32,
}

/// Classification of what a user question is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// A narrow fact; retrieval requests few chunks.
    SpecificFact,
    /// A broad structured summary; retrieval requests many chunks.
    DetailedSummary,
}

/// Year constraint extracted from a user question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    /// An explicit calendar year: `report_date` within that year.
    Year(i32),
    /// "Latest": no date predicate, newest report dates rank first.
    Latest,
}

/// Intent and metadata filters extracted from a user question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilters {
    pub intent: QueryIntent,
    pub document_type: Option<DocumentType>,
    pub year: Option<YearFilter>,
}

impl QueryFilters {
    /// Degraded-mode filters used when intent extraction fails or returns
    /// malformed output: a specific-fact query with no filters.
    pub fn fallback() -> Self {
        Self {
            intent: QueryIntent::SpecificFact,
            document_type: None,
            year: None,
        }
    }
}

/// Metadata predicate evaluated by the persistence gateway.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFilter {
    pub security_id: i64,
    pub document_type: Option<DocumentType>,
    pub year: Option<YearFilter>,
    /// Recency window (days) applied when no year filter was extracted.
    pub recency_days: i64,
}

/// A tracked security, identified by its exchange-suffixed ticker.
#[derive(Debug, Clone)]
pub struct Security {
    pub id: i64,
    pub ticker: String,
    pub long_name: Option<String>,
}

/// A scraped news article, upserted by unique URL.
#[derive(Debug, Clone)]
pub struct NewsArticle {
    pub security_id: i64,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub content: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

/// A quarterly financial-statement row, upserted by (security, report date).
#[derive(Debug, Clone)]
pub struct FinancialStatementRow {
    pub security_id: i64,
    pub report_date: NaiveDate,
    pub total_revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_debt: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_mapping_covers_known_tags() {
        assert_eq!(DocumentType::from_tag("AR"), DocumentType::AnnualReport);
        assert_eq!(DocumentType::from_tag("CR"), DocumentType::CreditRating);
        assert_eq!(
            DocumentType::from_tag("Concall"),
            DocumentType::ConcallTranscript
        );
        assert_eq!(DocumentType::from_tag("PPT"), DocumentType::ConcallPpt);
        assert_eq!(DocumentType::from_tag("10K"), DocumentType::Unknown);
    }

    #[test]
    fn label_roundtrip_for_concrete_types() {
        for dt in [
            DocumentType::AnnualReport,
            DocumentType::CreditRating,
            DocumentType::ConcallTranscript,
            DocumentType::ConcallPpt,
        ] {
            assert_eq!(DocumentType::parse_label(dt.as_str()), Some(dt));
        }
    }

    #[test]
    fn unknown_label_is_not_a_filter() {
        assert_eq!(DocumentType::parse_label("Unknown"), None);
        assert_eq!(DocumentType::parse_label("Prospectus"), None);
    }

    #[test]
    fn chunk_constructor_derives_hash() {
        let a = DocumentChunk::new(
            1,
            DocumentType::AnnualReport,
            "file:///a.pdf".into(),
            None,
            "revenue grew".into(),
            vec![0.0],
        );
        let b = DocumentChunk::new(
            1,
            DocumentType::AnnualReport,
            "file:///b.pdf".into(),
            None,
            "revenue grew".into(),
            vec![0.0],
        );
        assert_eq!(a.chunk_hash, b.chunk_hash);
        assert!(!a.chunk_hash.is_empty());
    }
}
