//! Retrieval filter construction and ranked chunk retrieval.
//!
//! Answering a question is a two-stage policy. First the language model
//! classifies the question's intent (narrow fact vs. broad summary) and
//! optionally extracts a document type and a year as structured JSON; that
//! extraction is best-effort, and anything malformed degrades to a
//! specific-fact query with no filters rather than failing the request.
//! Second, the filters become a metadata predicate plus ranking evaluated by
//! the persistence gateway, and the surviving chunks are assembled into an
//! analyst prompt for the final answer.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::embedding::{create_embedder, Embedder};
use crate::llm::{LanguageModel, OllamaGenerator};
use crate::models::{
    ChunkFilter, DocumentType, QueryFilters, QueryIntent, RetrievedChunk, YearFilter,
};
use crate::store;

/// Classify a question's intent and extract optional metadata filters.
///
/// Never fails: a failed call or malformed output falls back to
/// [`QueryFilters::fallback`].
pub async fn extract_filters(llm: &dyn LanguageModel, question: &str) -> QueryFilters {
    let prompt = filter_extraction_prompt(question);

    let value = match llm.complete_json(&prompt).await {
        Ok(value) => value,
        Err(err) => {
            warn!("intent extraction failed, using fallback filters: {err:#}");
            return QueryFilters::fallback();
        }
    };

    parse_filters(&value)
}

fn filter_extraction_prompt(question: &str) -> String {
    format!(
        r#"You classify questions about a company's financial documents.

Respond with a single JSON object with these fields:
- "intent": "specific_fact" when the question asks for a narrow fact or number, "detailed_summary" when it asks for a broad overview or analysis.
- "document_type": one of "Annual Report", "Credit Rating", "Concall Transcript", "Concall PPT" when the question clearly targets one document kind, otherwise null.
- "year": a four-digit year when the question names one, the string "latest" when it asks about the most recent document, otherwise null.

Question: {question}"#
    )
}

/// Interpret the model's structured output. A missing or unrecognized intent
/// means the whole object is untrustworthy and the fallback applies; an
/// unknown document-type string only clears the type filter.
pub fn parse_filters(value: &Value) -> QueryFilters {
    let intent = match value.get("intent").and_then(Value::as_str) {
        Some("specific_fact") => QueryIntent::SpecificFact,
        Some("detailed_summary") => QueryIntent::DetailedSummary,
        _ => return QueryFilters::fallback(),
    };

    let document_type = value
        .get("document_type")
        .and_then(Value::as_str)
        .and_then(DocumentType::parse_label);

    let year = match value.get("year") {
        Some(Value::String(s)) if s.eq_ignore_ascii_case("latest") => Some(YearFilter::Latest),
        Some(Value::String(s)) => s.parse::<i32>().ok().map(YearFilter::Year),
        Some(Value::Number(n)) => n.as_i64().map(|y| YearFilter::Year(y as i32)),
        _ => None,
    };

    QueryFilters {
        intent,
        document_type,
        year,
    }
}

/// Run both retrieval stages for one question against one security.
pub async fn retrieve_chunks(
    pool: &SqlitePool,
    embedder: &dyn Embedder,
    llm: &dyn LanguageModel,
    config: &Config,
    security_id: i64,
    question: &str,
) -> Result<Vec<RetrievedChunk>> {
    let filters = extract_filters(llm, question).await;

    let query_embedding = embedder
        .embed(question)
        .await
        .context("embedding the question")?;

    let limit = match filters.intent {
        QueryIntent::DetailedSummary => config.retrieval.summary_limit,
        QueryIntent::SpecificFact => config.retrieval.fact_limit,
    };

    let filter = ChunkFilter {
        security_id,
        document_type: filters.document_type,
        year: filters.year,
        recency_days: config.retrieval.recency_days,
    };

    store::nearest_chunks(
        pool,
        &filter,
        &query_embedding,
        limit,
        Utc::now().date_naive(),
    )
    .await
}

/// Assemble the retrieved chunks into the analyst prompt for the final
/// answer.
pub fn build_answer_prompt(stock: &str, question: &str, chunks: &[RetrievedChunk]) -> String {
    let mut context = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let date = chunk
            .report_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "undated".to_string());
        context.push_str(&format!(
            "[{}] ({}, {})\n{}\n\n",
            i + 1,
            chunk.document_type,
            date,
            chunk.chunk_text
        ));
    }

    format!(
        r#"You are an expert financial analyst for retail investors. Your goal is to provide a concise, unbiased, and easy-to-understand answer based only on the excerpts provided. Do not give financial advice.

Stock: {stock}

Document excerpts:
{context}
Question: {question}

Answer in a few sentences, citing excerpt numbers where relevant."#
    )
}

/// The `fin ask` command: resolve the ticker, retrieve, and answer.
pub async fn run_ask(config: &Config, ticker: &str, question: &str) -> Result<()> {
    let pool = db::connect(config).await?;

    let Some(security) = store::find_security(&pool, ticker).await? else {
        anyhow::bail!("Ticker '{}' is not registered. Add it with `fin tickers add`.", ticker);
    };

    let embedder = create_embedder(&config.embedding)?;
    let llm = OllamaGenerator::new(&config.llm)?;

    let chunks = retrieve_chunks(
        &pool,
        embedder.as_ref(),
        &llm,
        config,
        security.id,
        question,
    )
    .await?;

    if chunks.is_empty() {
        println!("No relevant information found.");
        pool.close().await;
        return Ok(());
    }

    let stock = match &security.long_name {
        Some(name) => format!("{} ({})", name, security.ticker),
        None => security.ticker.clone(),
    };

    let prompt = build_answer_prompt(&stock, question, &chunks);
    let answer = llm.complete(&prompt).await.context("generating the answer")?;

    println!("{}", answer.trim());

    pool.close().await;
    Ok(())
}
