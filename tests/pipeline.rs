//! End-to-end ingestion pipeline tests against the library API, with
//! deterministic in-process collaborator fakes.

mod common;

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use finsight::embedding::Embedder;
use finsight::ingest;
use finsight::llm::LanguageModel;
use finsight::parse::{parse_document, ParseError};
use finsight::retrieve;
use finsight::store;

fn write_source(cfg: &finsight::config::Config, name: &str, content: &[u8]) {
    fs::create_dir_all(&cfg.source.dir).unwrap();
    fs::write(cfg.source.dir.join(name), content).unwrap();
}

fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
}

#[tokio::test]
async fn ingest_categorizes_every_file_outcome() {
    let tmp = TempDir::new().unwrap();
    let cfg = common::test_config(tmp.path());
    let pool = common::test_pool(&cfg).await;
    store::insert_security(&pool, "RELIANCE.NS", None).await.unwrap();
    store::insert_security(&pool, "TCS.NS", None).await.unwrap();

    // One good file and five distinct skip cases.
    write_source(
        &cfg,
        "TCS_CR_crisil_20250730.txt",
        b"Quarterly credit profile remains stable with strong liquidity.",
    );
    write_source(&cfg, "RELIANCE.pdf", b"one token name");
    write_source(&cfg, "UNKNOWN_CR_icra_20250101.txt", b"nobody tracks this ticker");
    write_source(&cfg, "RELIANCE_PPT_202401.txt", b"ppt must be a pdf");
    write_source(&cfg, "TCS_CR_icra_20250601.txt", b"   \n\t  ");
    write_source(&cfg, "RELIANCE_2024.pdf", b"not really a pdf");

    let embedder: Arc<dyn Embedder> = Arc::new(common::FakeEmbedder { dims: 4 });
    let report = ingest::run_ingest(&cfg, &pool, embedder).await.unwrap();

    assert_eq!(report.files_found, 6);
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 5);
    assert_eq!(report.quarantined, 0);
    assert_eq!(report.chunks_inserted, 1);
    assert_eq!(report.chunks_dropped, 0);

    // The good file landed with its filename-derived metadata.
    let (doc_type, report_date): (String, Option<chrono::NaiveDate>) = sqlx::query_as(
        "SELECT document_type, report_date FROM document_chunks LIMIT 1",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(doc_type, "Credit Rating");
    assert_eq!(
        report_date,
        chrono::NaiveDate::from_ymd_opt(2025, 7, 30)
    );

    // Skipped files stay where they were.
    assert!(cfg.source.dir.join("RELIANCE.pdf").exists());
    assert!(!cfg.source.quarantine_dir().exists());
}

#[tokio::test]
async fn reingesting_the_same_file_inserts_nothing_new() {
    let tmp = TempDir::new().unwrap();
    let cfg = common::test_config(tmp.path());
    let pool = common::test_pool(&cfg).await;
    store::insert_security(&pool, "TCS.NS", None).await.unwrap();

    // 700 words chunked at 300/50 -> windows starting at words 0, 250, 500.
    write_source(&cfg, "TCS_CR_crisil_20240101.txt", words(700).as_bytes());

    let embedder: Arc<dyn Embedder> = Arc::new(common::FakeEmbedder { dims: 4 });

    let first = ingest::run_ingest(&cfg, &pool, embedder.clone()).await.unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(first.chunks_inserted, 3);

    let second = ingest::run_ingest(&cfg, &pool, embedder).await.unwrap();
    assert_eq!(second.processed, 1);
    assert_eq!(second.chunks_inserted, 0);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn failed_embeddings_drop_chunks_without_failing_the_file() {
    let tmp = TempDir::new().unwrap();
    let cfg = common::test_config(tmp.path());
    let pool = common::test_pool(&cfg).await;
    store::insert_security(&pool, "TCS.NS", None).await.unwrap();

    write_source(
        &cfg,
        "TCS_CR_crisil_20240101.txt",
        b"short credit rating note",
    );

    let embedder: Arc<dyn Embedder> = Arc::new(common::FailingEmbedder);
    let report = ingest::run_ingest(&cfg, &pool, embedder).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.quarantined, 0);
    assert_eq!(report.chunks_inserted, 0);
    assert_eq!(report.chunks_dropped, 1);

    // A later run with a healthy embedder heals the missing chunks.
    let embedder: Arc<dyn Embedder> = Arc::new(common::FakeEmbedder { dims: 4 });
    let retry = ingest::run_ingest(&cfg, &pool, embedder).await.unwrap();
    assert_eq!(retry.chunks_inserted, 1);
}

#[tokio::test]
async fn unexpected_persistence_failure_quarantines_the_file() {
    let tmp = TempDir::new().unwrap();
    let cfg = common::test_config(tmp.path());
    let pool = common::test_pool(&cfg).await;
    store::insert_security(&pool, "TCS.NS", None).await.unwrap();

    write_source(&cfg, "TCS_CR_crisil_20240101.txt", b"doomed credit note");

    // Sabotage the chunk table so the upsert blows up mid-pipeline.
    sqlx::query("DROP TABLE document_chunks")
        .execute(&pool)
        .await
        .unwrap();

    let embedder: Arc<dyn Embedder> = Arc::new(common::FakeEmbedder { dims: 4 });
    let report = ingest::run_ingest(&cfg, &pool, embedder.clone()).await.unwrap();

    assert_eq!(report.quarantined, 1);
    assert_eq!(report.processed, 0);

    // The file moved out of the scan path, terminally.
    assert!(!cfg.source.dir.join("TCS_CR_crisil_20240101.txt").exists());
    assert!(cfg
        .source
        .quarantine_dir()
        .join("TCS_CR_crisil_20240101.txt")
        .exists());

    // A subsequent run no longer sees it.
    finsight::migrate::run_migrations(&pool).await.unwrap();
    let rerun = ingest::run_ingest(&cfg, &pool, embedder).await.unwrap();
    assert_eq!(rerun.files_found, 0);
}

#[tokio::test]
async fn ask_flow_retrieves_through_extracted_filters() {
    let tmp = TempDir::new().unwrap();
    let cfg = common::test_config(tmp.path());
    let pool = common::test_pool(&cfg).await;
    let sid = store::insert_security(&pool, "TCS.NS", None).await.unwrap();

    write_source(
        &cfg,
        "TCS_CR_crisil_20250730.txt",
        b"The agency reaffirmed the AAA rating citing a robust order book.",
    );

    let embedder: Arc<dyn Embedder> = Arc::new(common::FakeEmbedder { dims: 4 });
    ingest::run_ingest(&cfg, &pool, embedder.clone()).await.unwrap();

    let llm = common::CannedLlm {
        structured: serde_json::json!({
            "intent": "specific_fact",
            "document_type": "Credit Rating",
            "year": "latest"
        }),
    };

    let chunks = retrieve::retrieve_chunks(
        &pool,
        embedder.as_ref(),
        &llm,
        &cfg,
        sid,
        "What is the latest credit rating?",
    )
    .await
    .unwrap();

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].chunk_text.contains("AAA rating"));

    let prompt = retrieve::build_answer_prompt("TCS.NS", "What is the latest credit rating?", &chunks);
    assert!(prompt.contains("AAA rating"));

    let answer = llm.complete(&prompt).await.unwrap();
    assert_eq!(answer, "canned answer");
}

#[tokio::test]
async fn broken_filter_extraction_still_retrieves() {
    let tmp = TempDir::new().unwrap();
    let cfg = common::test_config(tmp.path());
    let pool = common::test_pool(&cfg).await;
    let sid = store::insert_security(&pool, "TCS.NS", None).await.unwrap();

    // Dated one month ago so it sits inside the default recency window.
    let recent = chrono::Utc::now().date_naive() - chrono::Duration::days(30);
    write_source(
        &cfg,
        &format!("TCS_CR_crisil_{}.txt", recent.format("%Y%m%d")),
        b"Margins compressed on input costs.",
    );

    let embedder: Arc<dyn Embedder> = Arc::new(common::FakeEmbedder { dims: 4 });
    ingest::run_ingest(&cfg, &pool, embedder.clone()).await.unwrap();

    // Garbage structured output falls back to specific-fact, no filters; the
    // chunk is one month old under the default recency window.
    let llm = common::CannedLlm {
        structured: serde_json::json!({ "mood": "confused" }),
    };

    let chunks = retrieve::retrieve_chunks(
        &pool,
        embedder.as_ref(),
        &llm,
        &cfg,
        sid,
        "How are margins?",
    )
    .await
    .unwrap();

    assert_eq!(chunks.len(), 1);
}

#[test]
fn pdf_with_no_text_is_skip_equivalent() {
    // A structurally valid PDF with an empty content stream: the parser
    // contract treats "no text found" and extraction failure identically.
    use lopdf::{dictionary, Document, Object, Stream};

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("RELIANCE_2024.pdf");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(&path).unwrap();

    match parse_document(&path) {
        Ok(text) => assert!(text.is_empty()),
        Err(err) => assert!(matches!(err, ParseError::Pdf(_))),
    }
}
