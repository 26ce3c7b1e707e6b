//! Ingestion pipeline orchestration.
//!
//! Drives the full flow per source file: filename metadata → entity
//! resolution → parse → chunk → embed → persist. Files fan out over a
//! bounded worker pool; each file runs its pipeline independently and ends
//! in exactly one of three outcomes: succeeded, skipped, or quarantined.
//!
//! A skip leaves no trace: malformed names, unknown tickers, and empty
//! parses are logged and the file stays where it is. Anything unexpected
//! after metadata extraction quarantines the file: it is moved out of the
//! scan path and every chunk already written for it is deleted, so a file
//! either contributes all of its chunks or none across retries.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::chunk::chunk_words;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::filename::{extract_metadata, MetaError};
use crate::models::{DocumentChunk, UpsertOutcome};
use crate::parse::parse_document;
use crate::store;

/// Why a file was skipped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MalformedName,
    ExtensionMismatch,
    UnknownTicker,
    EmptyParse,
    EmptyChunks,
}

/// Terminal outcome of one file's pipeline.
#[derive(Debug)]
pub enum FileOutcome {
    Succeeded {
        chunks_inserted: u64,
        chunks_dropped: u64,
    },
    Skipped(SkipReason),
    Quarantined,
}

/// End-of-run summary counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestReport {
    pub files_found: u64,
    pub processed: u64,
    pub skipped: u64,
    pub quarantined: u64,
    pub chunks_inserted: u64,
    pub chunks_dropped: u64,
}

/// Everything a per-file task needs. Built once per run; the resolver map is
/// read-only after load and the pool is externally synchronized.
struct IngestContext {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    resolver: HashMap<String, i64>,
    ticker_suffix: String,
    chunk_size: usize,
    overlap: usize,
    quarantine_dir: PathBuf,
}

/// Run the ingestion pipeline over the configured source tree.
pub async fn run_ingest(
    config: &Config,
    pool: &SqlitePool,
    embedder: Arc<dyn Embedder>,
) -> Result<IngestReport> {
    // An unreachable store at startup is the one fatal error category.
    let resolver = store::load_securities(pool)
        .await
        .context("loading securities from the database")?;

    if resolver.is_empty() {
        warn!("no securities registered; every file will be skipped as unknown");
    }

    let files = scan_source_files(config)?;
    info!(count = files.len(), "found source files to process");

    let ctx = Arc::new(IngestContext {
        pool: pool.clone(),
        embedder,
        resolver,
        ticker_suffix: config.source.ticker_suffix.clone(),
        chunk_size: config.chunking.chunk_size_words,
        overlap: config.chunking.overlap_words,
        quarantine_dir: config.source.quarantine_dir(),
    });

    let mut report = IngestReport {
        files_found: files.len() as u64,
        ..IngestReport::default()
    };

    // Bounded fan-out: keep at most `workers` file tasks in flight.
    let workers = config.ingest.workers.max(1);
    let mut tasks: JoinSet<FileOutcome> = JoinSet::new();
    let mut pending = files.into_iter();

    loop {
        while tasks.len() < workers {
            match pending.next() {
                Some(path) => {
                    let ctx = ctx.clone();
                    tasks.spawn(async move { ingest_file(&ctx, &path).await });
                }
                None => break,
            }
        }

        match tasks.join_next().await {
            Some(Ok(outcome)) => tally(&mut report, &outcome),
            Some(Err(join_err)) => {
                error!("ingest task aborted: {join_err}");
                report.quarantined += 1;
            }
            None => break,
        }
    }

    println!("ingest {}", config.source.dir.display());
    println!("  files found: {}", report.files_found);
    println!("  processed: {}", report.processed);
    println!("  skipped: {}", report.skipped);
    println!("  quarantined: {}", report.quarantined);
    println!("  chunks inserted: {}", report.chunks_inserted);
    println!("  chunks dropped: {}", report.chunks_dropped);
    println!("ok");

    Ok(report)
}

fn tally(report: &mut IngestReport, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Succeeded {
            chunks_inserted,
            chunks_dropped,
        } => {
            report.processed += 1;
            report.chunks_inserted += chunks_inserted;
            report.chunks_dropped += chunks_dropped;
        }
        FileOutcome::Skipped(_) => report.skipped += 1,
        FileOutcome::Quarantined => report.quarantined += 1,
    }
}

/// Process one file to a terminal outcome. Unexpected errors quarantine.
async fn ingest_file(ctx: &IngestContext, path: &Path) -> FileOutcome {
    match process_file(ctx, path).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(file = %path.display(), "ingestion failed, quarantining: {err:#}");
            quarantine_file(ctx, path).await;
            FileOutcome::Quarantined
        }
    }
}

async fn process_file(ctx: &IngestContext, path: &Path) -> Result<FileOutcome> {
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        warn!(file = %path.display(), "skipping file with non-UTF-8 name");
        return Ok(FileOutcome::Skipped(SkipReason::MalformedName));
    };

    // 1. Filename metadata. Rejects leave the file untouched.
    let meta = match extract_metadata(filename) {
        Ok(meta) => meta,
        Err(MetaError::Malformed(reason)) => {
            warn!(file = filename, "skipping malformed filename: {reason}");
            return Ok(FileOutcome::Skipped(SkipReason::MalformedName));
        }
        Err(err @ MetaError::ExtensionMismatch { .. }) => {
            // Wrong file kind for this document type, not a bad name.
            debug!(file = filename, "skipping: {err}");
            return Ok(FileOutcome::Skipped(SkipReason::ExtensionMismatch));
        }
    };

    // 2. Entity resolution.
    let ticker = format!("{}{}", meta.ticker, ctx.ticker_suffix);
    let Some(&security_id) = ctx.resolver.get(&ticker) else {
        warn!(file = filename, ticker = %ticker, "skipping file for unknown ticker");
        return Ok(FileOutcome::Skipped(SkipReason::UnknownTicker));
    };

    // 3. Parse. Failure and "no text found" are the same skip.
    let text = match parse_document(path) {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => {
            warn!(file = filename, "skipping file with no extractable text");
            return Ok(FileOutcome::Skipped(SkipReason::EmptyParse));
        }
        Err(err) => {
            warn!(file = filename, "skipping unparseable file: {err}");
            return Ok(FileOutcome::Skipped(SkipReason::EmptyParse));
        }
    };

    // 4. Chunk. The window invariant was validated at config load; a failure
    // here is unexpected and falls through to quarantine.
    let chunks = chunk_words(&text, ctx.chunk_size, ctx.overlap)?;
    if chunks.is_empty() {
        warn!(file = filename, "skipping file that produced no chunks");
        return Ok(FileOutcome::Skipped(SkipReason::EmptyChunks));
    }

    // 5–6. Embed and persist. A failed embedding drops that chunk only.
    let source_url = source_url_for(path);
    let mut inserted = 0u64;
    let mut dropped = 0u64;

    for chunk_text in chunks {
        let embedding = match ctx.embedder.embed(&chunk_text).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(file = filename, "dropping chunk, embedding failed: {err:#}");
                dropped += 1;
                continue;
            }
        };

        let chunk = DocumentChunk::new(
            security_id,
            meta.doc_type,
            source_url.clone(),
            meta.report_date,
            chunk_text,
            embedding,
        );

        if let UpsertOutcome::Inserted = store::upsert_chunk(&ctx.pool, &chunk).await? {
            inserted += 1;
        }
    }

    info!(
        file = filename,
        inserted, dropped, "finished ingesting file"
    );

    Ok(FileOutcome::Succeeded {
        chunks_inserted: inserted,
        chunks_dropped: dropped,
    })
}

/// Move a failed file out of the scan path and roll back its chunks.
/// Quarantine is terminal per file; re-running an ingest will not see it.
async fn quarantine_file(ctx: &IngestContext, path: &Path) {
    let file_name = path.file_name().map(PathBuf::from).unwrap_or_default();

    if let Err(err) = std::fs::create_dir_all(&ctx.quarantine_dir) {
        error!("could not create quarantine directory: {err}");
    }
    if let Err(err) = std::fs::rename(path, ctx.quarantine_dir.join(&file_name)) {
        error!(file = %path.display(), "could not move file to quarantine: {err}");
    }

    match store::delete_chunks_for_source(&ctx.pool, &source_url_for(path)).await {
        Ok(count) => warn!(
            file = %path.display(),
            count, "rolled back chunks for quarantined file"
        ),
        Err(err) => error!(
            file = %path.display(),
            "could not roll back chunks for quarantined file: {err:#}"
        ),
    }
}

/// The source locator persisted with every chunk from this file.
pub fn source_url_for(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Walk the source tree, applying the configured include/exclude globs.
/// The quarantine directory is always excluded.
fn scan_source_files(config: &Config) -> Result<Vec<PathBuf>> {
    let root = &config.source.dir;
    if !root.is_dir() {
        bail!("source directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.source.include_globs)?;

    let mut excludes = vec!["**/quarantine/**".to_string()];
    excludes.extend(config.source.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    // Deterministic ordering
    files.sort();

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
