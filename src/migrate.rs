use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema. Idempotent, safe to run on every `fin init`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Tracked securities; the ingest resolver loads this table once per run.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS securities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL UNIQUE,
            long_name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Embedded document chunks. The four-column unique key gives upserts
    // their idempotency: identical text from the same source never
    // duplicates, the same text from another source is a separate row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            security_id INTEGER NOT NULL REFERENCES securities(id),
            document_type TEXT NOT NULL,
            source_url TEXT NOT NULL,
            report_date TEXT,
            chunk_text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            chunk_hash TEXT NOT NULL,
            UNIQUE(security_id, document_type, source_url, chunk_hash)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS news_articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            security_id INTEGER NOT NULL REFERENCES securities(id),
            title TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            published_at INTEGER NOT NULL,
            content TEXT,
            embedding BLOB
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS financial_statements (
            security_id INTEGER NOT NULL REFERENCES securities(id),
            report_date TEXT NOT NULL,
            total_revenue REAL,
            net_income REAL,
            total_assets REAL,
            total_debt REAL,
            operating_cash_flow REAL,
            free_cash_flow REAL,
            UNIQUE(security_id, report_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_security ON document_chunks(security_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_source_url ON document_chunks(source_url)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_report_date ON document_chunks(report_date)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_news_security ON news_articles(security_id)")
        .execute(pool)
        .await?;

    Ok(())
}
