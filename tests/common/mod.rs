//! Shared fixtures for the integration tests: deterministic in-process
//! collaborator fakes and a database/config scaffold.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;

use finsight::config::Config;
use finsight::embedding::Embedder;
use finsight::llm::LanguageModel;
use finsight::{db, migrate};

/// Deterministic embedder: folds the text's bytes into a fixed-length
/// vector. Equal texts embed equally; different texts almost never collide.
pub struct FakeEmbedder {
    pub dims: usize,
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            bail!("cannot embed empty text");
        }
        let mut v = vec![0.0f32; self.dims];
        for (i, b) in text.bytes().enumerate() {
            v[i % self.dims] += b as f32;
        }
        Ok(v)
    }
}

/// Embedder that always fails, for exercising the drop-chunk path.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing-embedder"
    }

    fn dims(&self) -> usize {
        4
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("embedding backend unavailable")
    }
}

/// Language model returning a canned structured response and a fixed answer.
pub struct CannedLlm {
    pub structured: serde_json::Value,
}

#[async_trait]
impl LanguageModel for CannedLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("canned answer".to_string())
    }

    async fn complete_json(&self, _prompt: &str) -> Result<serde_json::Value> {
        Ok(self.structured.clone())
    }
}

/// Test config rooted in a temp directory, with a small worker pool.
pub fn test_config(root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.db.path = root.join("data").join("test.sqlite");
    cfg.source.dir = root.join("docs");
    cfg.ingest.workers = 2;
    cfg
}

/// Connect and migrate a fresh database for the given config.
pub async fn test_pool(cfg: &Config) -> SqlitePool {
    let pool = db::connect(cfg).await.expect("connect test database");
    migrate::run_migrations(&pool)
        .await
        .expect("migrate test database");
    pool
}
