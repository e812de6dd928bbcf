//! # ragpipe CLI
//!
//! Command-line interface for ragpipe, a retrieval-augmented question
//! answering pipeline over your documents.
//!
//! Documents enter as extracted block files, get chunked and embedded into
//! an Elasticsearch index, and are then queried through a hybrid retrieval
//! funnel (query expansion, lexical + vector search, rank fusion, reranking)
//! that grounds a chat model's answer in cited sources.
//!
//! ## Commands
//!
//! - `ragpipe init` - Create the index
//! - `ragpipe ingest <BLOCKS.json> --source <NAME>` - Ingest extracted blocks
//! - `ragpipe ask <QUESTION>` - Answer a question from the indexed documents
//! - `ragpipe status` - Show index statistics
//! - `ragpipe delete` - Delete the index
//! - `ragpipe config` - Manage configuration
//!
//! ## Examples
//!
//! ```bash
//! # Create the index
//! ragpipe init
//!
//! # Ingest a document's extracted blocks
//! ragpipe ingest manual_blocks.json --source manual.pdf
//!
//! # Ask a question
//! ragpipe ask "How do I restart the alpha subsystem?"
//!
//! # Get JSON output
//! ragpipe ask "maintenance schedule" --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragpipe_core::{Block, DocumentStore, Embedder, IndexCreation};
use ragpipe_index::Indexer;
use ragpipe_model::{ApiEmbedder, ApiReranker, ChatGenerator, EmbedderPool};
use ragpipe_retrieval::AnswerPipeline;
use ragpipe_store::ElasticStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "ragpipe")]
#[command(about = "Retrieval-augmented question answering over your documents")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/ragpipe/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index sized for the configured embedding model
    Init,

    /// Ingest a JSON file of extracted content blocks
    Ingest {
        /// Path to a JSON array of blocks
        blocks: PathBuf,

        /// Source name recorded on every chunk
        #[arg(short, long)]
        source: String,
    },

    /// Answer a question from the indexed documents
    Ask {
        /// The question
        question: String,
    },

    /// Show index statistics
    Status,

    /// Delete the index and everything in it
    Delete,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for ingest reports.
#[derive(Serialize)]
struct IngestOutput {
    index: String,
    source: String,
    chunks_total: usize,
    chunks_indexed: usize,
    chunks_skipped: usize,
    batches: usize,
}

/// Output structure for status.
#[derive(Serialize)]
struct StatusOutput {
    index: String,
    doc_count: u64,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

/// Build the document store from config.
fn create_store(config: &Config) -> Arc<dyn DocumentStore> {
    Arc::new(ElasticStore::new(&config.store.url))
}

/// Build the pooled embedding client from config.
fn create_embedder(config: &Config) -> Arc<dyn Embedder> {
    let api = ApiEmbedder::new(
        &config.embedding.url,
        &config.embedding.model,
        config.embedding.dimension,
    );
    Arc::new(EmbedderPool::new(
        Arc::new(api),
        config.indexing.max_concurrent_batches,
    ))
}

/// Build the ingestion service from config.
fn create_indexer(config: &Config) -> Result<Indexer> {
    Ok(Indexer::new(
        create_store(config),
        create_embedder(config),
        config.indexer_config(),
    )?)
}

/// Build the full answering pipeline from config.
fn create_pipeline(config: &Config) -> AnswerPipeline {
    let reranker = Arc::new(ApiReranker::new(&config.rerank.url, &config.rerank.model));
    let generator = Arc::new(ChatGenerator::new(&config.chat.base_url, &config.chat.model));

    AnswerPipeline::new(
        create_store(config),
        create_embedder(config),
        reranker,
        generator,
        config.pipeline_config(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Init => {
            let indexer = create_indexer(&config)?;

            match indexer.create_index(&config.store.index).await? {
                IndexCreation::Created => {
                    println!("Created index '{}'", config.store.index);
                }
                IndexCreation::AlreadyExists => {
                    println!("Index '{}' already exists", config.store.index);
                }
            }
        }

        Commands::Ingest { blocks, source } => {
            let raw = std::fs::read_to_string(&blocks)
                .with_context(|| format!("Failed to read blocks file {}", blocks.display()))?;
            let blocks: Vec<Block> = serde_json::from_str(&raw)
                .context("Blocks file is not a JSON array of blocks")?;

            if blocks.is_empty() {
                anyhow::bail!("Blocks file contains no blocks");
            }

            let indexer = create_indexer(&config)?;

            // A schema mismatch surfaces here, before anything is written.
            indexer.create_index(&config.store.index).await?;

            let report = indexer
                .ingest(&config.store.index, &source, &blocks)
                .await?;

            match cli.format {
                OutputFormat::Json => {
                    let output = IngestOutput {
                        index: config.store.index.clone(),
                        source,
                        chunks_total: report.chunks_total,
                        chunks_indexed: report.chunks_indexed,
                        chunks_skipped: report.chunks_skipped,
                        batches: report.batches,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Ingested '{}' into '{}'", source, config.store.index);
                    println!(
                        "  Chunks:  {} total, {} indexed, {} skipped",
                        report.chunks_total, report.chunks_indexed, report.chunks_skipped
                    );
                    println!("  Batches: {}", report.batches);
                }
            }
        }

        Commands::Ask { question } => {
            let pipeline = create_pipeline(&config);
            let answer = pipeline.ask(&config.store.index, &question).await?;

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&answer)?);
                }
                OutputFormat::Text => {
                    println!("{}", answer.text);
                    if !answer.sources.is_empty() {
                        println!();
                        println!("Sources:");
                        for source in &answer.sources {
                            println!(
                                "  [{}] {} p.{} ({}, score {:.3})",
                                source.citation,
                                source.source,
                                source.page,
                                source.content_type,
                                source.score
                            );
                        }
                    }
                }
            }
        }

        Commands::Status => {
            let store = create_store(&config);

            if !store.index_exists(&config.store.index).await? {
                match cli.format {
                    OutputFormat::Json => {
                        println!(r#"{{"error": "Index not found"}}"#);
                    }
                    OutputFormat::Text => {
                        println!("Index '{}' not found", config.store.index);
                        println!("Run 'ragpipe init' to create it.");
                    }
                }
                return Ok(());
            }

            let stats = store.stats(&config.store.index).await?;

            match cli.format {
                OutputFormat::Json => {
                    let output = StatusOutput {
                        index: config.store.index.clone(),
                        doc_count: stats.doc_count,
                        size_bytes: stats.size_bytes,
                        last_updated: stats.last_updated.map(|t| t.to_rfc3339()),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Index '{}'", config.store.index);
                    println!("  Documents: {}", stats.doc_count);
                    println!("  Size:      {} bytes", stats.size_bytes);
                    if let Some(last) = stats.last_updated {
                        println!("  Updated:   {}", last.format("%Y-%m-%d %H:%M:%S"));
                    }
                }
            }
        }

        Commands::Delete => {
            let store = create_store(&config);
            let deleted = store.delete_index(&config.store.index).await?;

            if deleted {
                println!("Deleted index '{}'", config.store.index);
            } else {
                println!("Index '{}' does not exist", config.store.index);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}
