//! Persistence gateway.
//!
//! Every database operation the pipeline performs goes through this module:
//! idempotent chunk upserts keyed by content hash, bulk rollback for
//! quarantined sources, filtered nearest-neighbor retrieval, and the simple
//! keyed upserts for news articles and financial statements. Each operation
//! is a single statement, so concurrent callers sharing the pool never
//! observe a partial write.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{
    ChunkFilter, DocumentChunk, DocumentType, FinancialStatementRow, NewsArticle, RetrievedChunk,
    Security, UpsertOutcome, YearFilter,
};

/// Insert a chunk unless an identical one already exists for the same
/// security, document type, and source.
pub async fn upsert_chunk(pool: &SqlitePool, chunk: &DocumentChunk) -> Result<UpsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO document_chunks
            (security_id, document_type, source_url, report_date, chunk_text, embedding, chunk_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(security_id, document_type, source_url, chunk_hash) DO NOTHING
        "#,
    )
    .bind(chunk.security_id)
    .bind(chunk.document_type.as_str())
    .bind(&chunk.source_url)
    .bind(chunk.report_date)
    .bind(&chunk.chunk_text)
    .bind(vec_to_blob(&chunk.embedding))
    .bind(&chunk.chunk_hash)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() > 0 {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::AlreadyExisted
    })
}

/// Delete every chunk written for a source file. Used to roll back a
/// partially ingested file on quarantine. Returns the number of rows removed.
pub async fn delete_chunks_for_source(pool: &SqlitePool, source_url: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM document_chunks WHERE source_url = ?")
        .bind(source_url)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Fetch the chunks matching a metadata predicate, ranked against a query
/// embedding.
///
/// The predicate always filters by security, optionally by document type,
/// and by date according to the year filter: an explicit year bounds
/// `report_date` to that calendar year, no year applies the recency window
/// ending at `today`, and `Latest` applies no date predicate but ranks newer
/// report dates strictly before older ones (undated chunks last), with
/// vector distance breaking ties. Otherwise ranking is by distance alone.
pub async fn nearest_chunks(
    pool: &SqlitePool,
    filter: &ChunkFilter,
    query_embedding: &[f32],
    limit: usize,
    today: NaiveDate,
) -> Result<Vec<RetrievedChunk>> {
    let mut sql = String::from(
        "SELECT document_type, source_url, report_date, chunk_text, embedding \
         FROM document_chunks WHERE security_id = ?",
    );
    if filter.document_type.is_some() {
        sql.push_str(" AND document_type = ?");
    }
    match filter.year {
        Some(YearFilter::Year(_)) => sql.push_str(" AND report_date >= ? AND report_date <= ?"),
        Some(YearFilter::Latest) => {}
        None => sql.push_str(" AND report_date >= ?"),
    }

    let mut query = sqlx::query(&sql).bind(filter.security_id);
    if let Some(doc_type) = filter.document_type {
        query = query.bind(doc_type.as_str());
    }
    match filter.year {
        Some(YearFilter::Year(year)) => {
            let start = NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| anyhow!("invalid year filter: {}", year))?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31)
                .ok_or_else(|| anyhow!("invalid year filter: {}", year))?;
            query = query.bind(start).bind(end);
        }
        Some(YearFilter::Latest) => {}
        None => {
            let cutoff = today - chrono::Duration::days(filter.recency_days);
            query = query.bind(cutoff);
        }
    }

    let rows = query.fetch_all(pool).await?;

    let mut results: Vec<RetrievedChunk> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            let embedding = blob_to_vec(&blob);
            let distance = 1.0 - cosine_similarity(query_embedding, &embedding);
            let type_label: String = row.get("document_type");
            RetrievedChunk {
                chunk_text: row.get("chunk_text"),
                document_type: DocumentType::parse_label(&type_label)
                    .unwrap_or(DocumentType::Unknown),
                source_url: row.get("source_url"),
                report_date: row.get("report_date"),
                distance,
            }
        })
        .collect();

    match filter.year {
        Some(YearFilter::Latest) => {
            // Newest report date first (None sorts last), distance second.
            results.sort_by(|a, b| {
                b.report_date
                    .cmp(&a.report_date)
                    .then(a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
            });
        }
        _ => {
            results.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.report_date.cmp(&a.report_date))
            });
        }
    }

    results.truncate(limit);
    Ok(results)
}

/// Load the ticker → security-id lookup table the ingest resolver uses.
/// Read-only for the rest of the run.
pub async fn load_securities(pool: &SqlitePool) -> Result<HashMap<String, i64>> {
    let rows = sqlx::query("SELECT id, ticker FROM securities")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>("ticker"), row.get::<i64, _>("id")))
        .collect())
}

/// Register a security, updating the long name if the ticker already exists.
pub async fn insert_security(
    pool: &SqlitePool,
    ticker: &str,
    long_name: Option<&str>,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO securities (ticker, long_name) VALUES (?, ?)
        ON CONFLICT(ticker) DO UPDATE SET long_name = excluded.long_name
        RETURNING id
        "#,
    )
    .bind(ticker)
    .bind(long_name)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn find_security(pool: &SqlitePool, ticker: &str) -> Result<Option<Security>> {
    let row = sqlx::query("SELECT id, ticker, long_name FROM securities WHERE ticker = ?")
        .bind(ticker)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Security {
        id: row.get("id"),
        ticker: row.get("ticker"),
        long_name: row.get("long_name"),
    }))
}

pub async fn list_securities(pool: &SqlitePool) -> Result<Vec<Security>> {
    let rows = sqlx::query("SELECT id, ticker, long_name FROM securities ORDER BY ticker")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Security {
            id: row.get("id"),
            ticker: row.get("ticker"),
            long_name: row.get("long_name"),
        })
        .collect())
}

/// Insert a news article unless its URL is already stored. Returns whether a
/// new row was written.
pub async fn upsert_news_article(pool: &SqlitePool, article: &NewsArticle) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO news_articles (security_id, title, url, published_at, content, embedding)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(url) DO NOTHING
        "#,
    )
    .bind(article.security_id)
    .bind(&article.title)
    .bind(&article.url)
    .bind(article.published_at.timestamp())
    .bind(&article.content)
    .bind(article.embedding.as_deref().map(vec_to_blob))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert a quarterly statement row unless one exists for the same security
/// and report date.
pub async fn upsert_financial_statement(
    pool: &SqlitePool,
    row: &FinancialStatementRow,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO financial_statements
            (security_id, report_date, total_revenue, net_income, total_assets,
             total_debt, operating_cash_flow, free_cash_flow)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(security_id, report_date) DO NOTHING
        "#,
    )
    .bind(row.security_id)
    .bind(row.report_date)
    .bind(row.total_revenue)
    .bind(row.net_income)
    .bind(row.total_assets)
    .bind(row.total_debt)
    .bind(row.operating_cash_flow)
    .bind(row.free_cash_flow)
    .execute(pool)
    .await?;

    Ok(())
}
