//! # Finsight CLI (`fin`)
//!
//! The `fin` binary is the operational surface of the pipeline: database
//! initialization, ticker registration, document ingestion, and
//! retrieval-augmented questions.
//!
//! ## Usage
//!
//! ```bash
//! fin --config ./config/finsight.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fin init` | Create the SQLite database and run schema migrations |
//! | `fin tickers add <TICKER>` | Register a security the resolver can map files to |
//! | `fin tickers list` | List registered securities |
//! | `fin ingest` | Parse, chunk, embed, and persist the source directory |
//! | `fin ask <TICKER> "<question>"` | Answer a question from the indexed documents |
//! | `fin stats` | Database overview |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use finsight::embedding::{create_embedder, Embedder};
use finsight::{config, db, ingest, migrate, retrieve, stats, store};

/// Finsight — financial document ingestion and retrieval-augmented queries.
#[derive(Parser)]
#[command(
    name = "fin",
    about = "Finsight — a financial document ingestion and retrieval-augmented query pipeline",
    version,
    long_about = "Finsight ingests downloaded financial documents (annual reports, credit \
    ratings, concall transcripts and PPTs), chunks and embeds them into SQLite, and answers \
    free-text questions about a security by retrieving the most relevant chunks under \
    metadata filters and prompting a local language model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/finsight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Idempotent:
    /// running it multiple times is safe.
    Init,

    /// Manage the registered securities the ingest resolver maps files to.
    Tickers {
        #[command(subcommand)]
        action: TickersAction,
    },

    /// Ingest the configured source directory.
    ///
    /// Scans the source tree, extracts filename metadata, parses and chunks
    /// each document, embeds every chunk, and persists the results. Prints
    /// end-of-run summary counts.
    Ingest,

    /// Ask a question about a registered security.
    ///
    /// Classifies the question, retrieves the most relevant chunks under the
    /// extracted filters, and prompts the answer model.
    Ask {
        /// Exchange-suffixed ticker, e.g. RELIANCE.NS.
        ticker: String,
        /// The free-text question.
        question: String,
    },

    /// Print database statistics.
    Stats,
}

#[derive(Subcommand)]
enum TickersAction {
    /// Register a security (or update its long name).
    Add {
        /// Exchange-suffixed ticker, e.g. RELIANCE.NS.
        ticker: String,
        /// Human-readable company name.
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered securities.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Tickers { action } => match action {
            TickersAction::Add { ticker, name } => {
                let pool = db::connect(&cfg).await?;
                let id = store::insert_security(&pool, &ticker, name.as_deref()).await?;
                pool.close().await;
                println!("Registered {} (id {}).", ticker, id);
            }
            TickersAction::List => {
                let pool = db::connect(&cfg).await?;
                let securities = store::list_securities(&pool).await?;
                if securities.is_empty() {
                    println!("No securities registered.");
                }
                for security in securities {
                    println!(
                        "{:>4}  {:<16} {}",
                        security.id,
                        security.ticker,
                        security.long_name.as_deref().unwrap_or("-")
                    );
                }
                pool.close().await;
            }
        },
        Commands::Ingest => {
            let pool = db::connect(&cfg).await?;
            let embedder: Arc<dyn Embedder> = create_embedder(&cfg.embedding)?.into();
            ingest::run_ingest(&cfg, &pool, embedder).await?;
            pool.close().await;
        }
        Commands::Ask { ticker, question } => {
            retrieve::run_ask(&cfg, &ticker, &question).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
