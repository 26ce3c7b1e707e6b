//! Overlapping word-window text chunker.
//!
//! Splits a flat document body into fixed-size windows of whitespace-separated
//! words, each overlapping the previous one by a configurable word count. The
//! window start advances by `chunk_size - overlap` words per step, so the
//! overlap must stay strictly below the chunk size or the window would never
//! move.
//!
//! Each chunk gets a SHA-256 content hash, the deduplication key for the
//! persistence layer's upsert.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

/// Split text into overlapping word windows.
///
/// Empty input yields an empty vector, not an error. Null and other control
/// characters are stripped from each produced chunk.
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        bail!("chunk size must be > 0");
    }
    if overlap >= chunk_size {
        bail!(
            "overlap ({}) must be smaller than chunk size ({})",
            overlap,
            chunk_size
        );
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        let window = words[start..end].join(" ");
        chunks.push(strip_control_chars(&window));
        start += step;
    }

    Ok(chunks)
}

fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// SHA-256 hex digest of a chunk's text.
pub fn chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
