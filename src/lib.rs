//! # Finsight
//!
//! A financial document ingestion and retrieval-augmented query pipeline.
//!
//! Finsight scans a directory of downloaded financial documents (annual
//! reports, credit ratings, concall transcripts and PPTs), splits them into
//! overlapping word chunks, embeds each chunk, and persists everything in
//! SQLite with idempotent content-hash upserts. On the query side it
//! classifies a free-text question, builds a metadata predicate (ticker,
//! document type, date) plus vector ranking, and assembles the surviving
//! chunks into a prompt for the answer model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────┐
//! │ Source files │──▶│ Parse+Chunk+Embed │──▶│  SQLite   │
//! │ PDF / TXT    │   │  (worker pool)    │   │  chunks   │
//! └──────────────┘   └───────────────────┘   └────┬─────┘
//!                                                 │
//!                               ┌─────────────────┤
//!                               ▼                 ▼
//!                        ┌────────────┐    ┌────────────┐
//!                        │ fin ingest │    │  fin ask   │
//!                        └────────────┘    └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fin init                                # create database
//! fin tickers add RELIANCE.NS --name "Reliance Industries"
//! fin ingest                              # parse, chunk, embed, persist
//! fin ask RELIANCE.NS "How did revenue develop in the latest annual report?"
//! fin stats                               # database overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`filename`] | Filename metadata extraction |
//! | [`parse`] | PDF/TXT text extraction |
//! | [`chunk`] | Overlapping word-window chunking |
//! | [`embedding`] | Embedding collaborator boundary |
//! | [`llm`] | Language-model collaborator boundary |
//! | [`ingest`] | Ingestion orchestration and quarantine |
//! | [`store`] | Persistence gateway |
//! | [`retrieve`] | Filter extraction and ranked retrieval |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod filename;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod parse;
pub mod retrieve;
pub mod stats;
pub mod store;
