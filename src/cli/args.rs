//! Command line argument parsing for the Tessera CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Tessera - hybrid semantic and keyword search for membership content
#[derive(Parser, Debug, Clone)]
#[command(name = "tessera")]
#[command(about = "Hybrid semantic and keyword search for membership content")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct TesseraArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TesseraArgs {
    /// Get the effective verbosity level.
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Output formats for query results.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// JSON, one document per invocation.
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Ingest a JSON corpus into a snapshot
    Index(IndexArgs),

    /// Search a snapshot
    Search(SearchArgs),

    /// Recommend items similar to a stored item
    Similar(SimilarArgs),

    /// Remove one item from a snapshot
    Remove(RemoveArgs),

    /// Show snapshot statistics
    Stats(StatsArgs),
}

/// Arguments for corpus ingestion
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Directory holding the snapshot
    #[arg(value_name = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,

    /// Corpus file: a JSON array of content updates
    #[arg(short, long, value_name = "CORPUS_FILE")]
    pub corpus: PathBuf,

    /// Embedding dimension, used when creating a fresh snapshot
    #[arg(short, long, default_value_t = 1536)]
    pub dimension: usize,
}

/// Search modes matching the three query entry points
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Keyword-only search.
    Lexical,
    /// Vector-only search.
    Semantic,
    /// Fused search.
    Hybrid,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Directory holding the snapshot
    #[arg(value_name = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,

    /// Search mode
    #[arg(short, long, default_value = "lexical")]
    pub mode: SearchMode,

    /// Query text (lexical and hybrid modes)
    #[arg(short = 't', long)]
    pub query: Option<String>,

    /// Query vector as a JSON array (semantic and hybrid modes)
    #[arg(long, value_name = "JSON")]
    pub vector: Option<String>,

    /// Restrict results to one content type
    #[arg(short, long)]
    pub content_type: Option<String>,

    /// Metadata filters as a JSON array of predicates
    #[arg(long, value_name = "JSON")]
    pub filters: Option<String>,

    /// Maximum number of results
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Minimum similarity (semantic mode)
    #[arg(long, default_value_t = 0.0)]
    pub min_similarity: f32,

    /// Keyword weight (hybrid mode)
    #[arg(long, default_value_t = 0.5)]
    pub keyword_weight: f32,

    /// Semantic weight (hybrid mode)
    #[arg(long, default_value_t = 0.5)]
    pub semantic_weight: f32,

    /// Min-max normalize both score scales before weighting (hybrid mode)
    #[arg(long)]
    pub normalize: bool,

    /// Build the ANN graph before searching instead of exact-scanning
    #[arg(long)]
    pub ann: bool,

    /// Member id to attribute the query to in the query log
    #[arg(long)]
    pub issued_by: Option<String>,
}

/// Arguments for recommendations
#[derive(Parser, Debug, Clone)]
pub struct SimilarArgs {
    /// Directory holding the snapshot
    #[arg(value_name = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,

    /// Content type of the source item
    #[arg(short = 'T', long)]
    pub content_type: String,

    /// Content id of the source item
    #[arg(short, long)]
    pub id: String,

    /// Maximum number of results
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Build the ANN graph before searching instead of exact-scanning
    #[arg(long)]
    pub ann: bool,
}

/// Arguments for removing an item
#[derive(Parser, Debug, Clone)]
pub struct RemoveArgs {
    /// Directory holding the snapshot
    #[arg(value_name = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,

    /// Content type of the item
    #[arg(short = 'T', long)]
    pub content_type: String,

    /// Content id of the item
    #[arg(short, long)]
    pub id: String,
}

/// Arguments for statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Directory holding the snapshot
    #[arg(value_name = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,
}
