use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/finsight.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Root of the downloaded-documents tree scanned by `fin ingest`.
    #[serde(default = "default_source_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Exchange suffix appended to filename tickers before entity lookup.
    #[serde(default = "default_ticker_suffix")]
    pub ticker_suffix: String,
}

impl SourceConfig {
    /// Quarantined files live under the source tree and are excluded from
    /// every scan.
    pub fn quarantine_dir(&self) -> PathBuf {
        self.dir.join("quarantine")
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            ticker_suffix: default_ticker_suffix(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("financial_reports")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string(), "**/*.txt".to_string()]
}

fn default_ticker_suffix() -> String {
    ".NS".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size_words")]
    pub chunk_size_words: usize,
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size_words(),
            overlap_words: default_overlap_words(),
        }
    }
}

fn default_chunk_size_words() -> usize {
    300
}

fn default_overlap_words() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            base_url: default_ollama_url(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "mxbai-embed-large".to_string()
}

fn default_embedding_dims() -> usize {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
        }
    }
}

fn default_llm_model() -> String {
    "llama3".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_llm_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Chunks requested for a specific-fact question.
    #[serde(default = "default_fact_limit")]
    pub fact_limit: usize,
    /// Chunks requested for a detailed-summary question.
    #[serde(default = "default_summary_limit")]
    pub summary_limit: usize,
    /// Default recency window when no year filter was extracted.
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fact_limit: default_fact_limit(),
            summary_limit: default_summary_limit(),
            recency_days: default_recency_days(),
        }
    }
}

fn default_fact_limit() -> usize {
    5
}

fn default_summary_limit() -> usize {
    20
}

fn default_recency_days() -> i64 {
    730
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Bounded worker-pool size: files processed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    8
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

/// Fail fast on invariants the pipeline relies on downstream.
pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size_words == 0 {
        anyhow::bail!("chunking.chunk_size_words must be > 0");
    }

    if config.chunking.overlap_words >= config.chunking.chunk_size_words {
        anyhow::bail!(
            "chunking.overlap_words ({}) must be smaller than chunk_size_words ({})",
            config.chunking.overlap_words,
            config.chunking.chunk_size_words
        );
    }

    if config.ingest.workers == 0 {
        anyhow::bail!("ingest.workers must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "ollama" => {}
        other => anyhow::bail!("Unknown embedding provider: '{}'. Must be ollama.", other),
    }

    if config.retrieval.fact_limit < 1 || config.retrieval.summary_limit < 1 {
        anyhow::bail!("retrieval limits must be >= 1");
    }

    if config.retrieval.recency_days < 1 {
        anyhow::bail!("retrieval.recency_days must be >= 1");
    }

    Ok(())
}
