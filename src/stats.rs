//! Database statistics and health overview.
//!
//! A quick summary of what's indexed: securities, chunk counts, distinct
//! sources, and news coverage. Used by `fin stats` to give confidence that
//! ingestion runs are landing where expected.

use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let securities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM securities")
        .fetch_one(&pool)
        .await?;

    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks")
        .fetch_one(&pool)
        .await?;

    let sources: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT source_url) FROM document_chunks")
            .fetch_one(&pool)
            .await?;

    let dated: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM document_chunks WHERE report_date IS NOT NULL",
    )
    .fetch_one(&pool)
    .await?;

    let articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_articles")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Finsight — Database Stats");
    println!("=========================");
    println!();
    println!("  Database:       {}", config.db.path.display());
    println!("  Size:           {}", format_bytes(db_size));
    println!();
    println!("  Securities:     {}", securities);
    println!("  Chunks:         {}", chunks);
    println!("  Source files:   {}", sources);
    println!(
        "  Dated chunks:   {} / {} ({}%)",
        dated,
        chunks,
        if chunks > 0 { (dated * 100) / chunks } else { 0 }
    );
    println!("  News articles:  {}", articles);

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
