//! Command implementations for the Tessera CLI.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::cli::args::*;
use crate::content::{ContentKey, ContentType};
use crate::engine::{EngineConfig, SearchEngine, timed};
use crate::error::{Result, TesseraError};
use crate::filter::FieldFilter;
use crate::hybrid::scorer::ScoreNormalization;
use crate::hybrid::searcher::HybridSearchRequest;
use crate::index::ContentUpdate;
use crate::lexical::searcher::LexicalSearchRequest;
use crate::querylog::{QueryKind, QueryRecord};
use crate::storage::{FileStorage, Storage};
use crate::vector::Vector;
use crate::vector::searcher::SemanticSearchRequest;

/// Blob name of the index snapshot inside a snapshot directory.
const SNAPSHOT_BLOB: &str = "index.snap";
/// Blob name of the append-only query log beside the snapshot.
const QUERY_LOG_BLOB: &str = "queries.jsonl";

/// Execute a CLI command.
pub fn execute_command(args: TesseraArgs) -> Result<()> {
    match &args.command {
        Command::Index(index_args) => run_index(index_args.clone(), &args),
        Command::Search(search_args) => run_search(search_args.clone(), &args),
        Command::Similar(similar_args) => run_similar(similar_args.clone(), &args),
        Command::Remove(remove_args) => run_remove(remove_args.clone(), &args),
        Command::Stats(stats_args) => run_stats(stats_args.clone(), &args),
    }
}

fn open_engine(snapshot_dir: &Path) -> Result<(FileStorage, SearchEngine)> {
    let storage = FileStorage::new(snapshot_dir)?;
    if !storage.exists(SNAPSHOT_BLOB) {
        return Err(TesseraError::invalid_operation(format!(
            "no snapshot found in {}; run `tessera index` first",
            snapshot_dir.display()
        )));
    }
    let engine = SearchEngine::open_snapshot(&storage, SNAPSHOT_BLOB)?;
    Ok((storage, engine))
}

fn run_index(args: IndexArgs, cli_args: &TesseraArgs) -> Result<()> {
    let storage = FileStorage::new(&args.snapshot_dir)?;
    let engine = if storage.exists(SNAPSHOT_BLOB) {
        SearchEngine::open_snapshot(&storage, SNAPSHOT_BLOB)?
    } else {
        SearchEngine::new(EngineConfig::new(args.dimension))
    };

    let file = File::open(&args.corpus)?;
    let updates: Vec<ContentUpdate> = serde_json::from_reader(BufReader::new(file))?;
    let count = updates.len();

    for update in updates {
        if cli_args.verbosity() > 1 {
            println!("indexing {}", update.key);
        }
        engine.upsert(update)?;
    }

    engine.save_snapshot(&storage, SNAPSHOT_BLOB)?;
    if cli_args.verbosity() > 0 {
        println!(
            "indexed {count} items into {}",
            args.snapshot_dir.display()
        );
    }
    Ok(())
}

fn run_search(args: SearchArgs, cli_args: &TesseraArgs) -> Result<()> {
    let (_storage, mut engine) = open_engine(&args.snapshot_dir)?;
    engine.attach_query_log_sink(
        std::sync::Arc::new(FileStorage::new(&args.snapshot_dir)?),
        QUERY_LOG_BLOB,
    );
    if args.ann {
        engine.rebuild_ann_now()?;
    }

    let content_type = parse_content_type(args.content_type.as_deref())?;
    let filters = parse_filters(args.filters.as_deref())?;
    let query_text = args.query.clone().unwrap_or_default();

    match args.mode {
        SearchMode::Lexical => {
            let text = args
                .query
                .as_deref()
                .ok_or_else(|| TesseraError::invalid_operation("--query is required"))?;
            let mut request = LexicalSearchRequest::new(args.limit);
            if let Some(ct) = content_type {
                request = request.content_type(ct);
            }
            let (hits, latency_ms) = timed(|| engine.lexical_search(text, &request));
            let hits = hits?;
            log_query(
                &engine,
                &args,
                QueryKind::Lexical,
                &query_text,
                &filters,
                hits.len(),
                hits.first().map(|h| (h.key.clone(), h.score)),
                latency_ms,
            );
            print_hits(cli_args, latency_ms, &hits, |hit| {
                format!(
                    "{:8.4}  {}  {}",
                    hit.score,
                    hit.key,
                    hit.title.as_deref().unwrap_or("")
                )
            })
        }
        SearchMode::Semantic => {
            let vector = parse_vector(args.vector.as_deref())?;
            let mut request = SemanticSearchRequest::new(args.limit)
                .filters(filters.clone())
                .min_similarity(args.min_similarity);
            if let Some(ct) = content_type {
                request = request.content_type(ct);
            }
            let (hits, latency_ms) = timed(|| engine.semantic_search(&vector, &request));
            let hits = hits?;
            log_query(
                &engine,
                &args,
                QueryKind::Semantic,
                &query_text,
                &filters,
                hits.len(),
                hits.first().map(|h| (h.key.clone(), h.similarity)),
                latency_ms,
            );
            print_hits(cli_args, latency_ms, &hits, |hit| {
                format!("{:8.4}  {}", hit.similarity, hit.key)
            })
        }
        SearchMode::Hybrid => {
            let text = args
                .query
                .as_deref()
                .ok_or_else(|| TesseraError::invalid_operation("--query is required"))?;
            let vector = parse_vector(args.vector.as_deref())?;
            let mut request = HybridSearchRequest::new(text, vector)
                .filters(filters.clone())
                .limit(args.limit)
                .keyword_weight(args.keyword_weight)
                .semantic_weight(args.semantic_weight);
            if args.normalize {
                request = request.normalization(ScoreNormalization::MinMax);
            }
            if let Some(ct) = content_type {
                request = request.content_type(ct);
            }
            let (hits, latency_ms) = timed(|| engine.hybrid_search(&request));
            let hits = hits?;
            log_query(
                &engine,
                &args,
                QueryKind::Hybrid,
                &query_text,
                &filters,
                hits.len(),
                hits.first().map(|h| (h.key.clone(), h.combined_score)),
                latency_ms,
            );
            print_hits(cli_args, latency_ms, &hits, |hit| {
                format!(
                    "{:8.4}  (kw {:.4} / sem {:.4})  {}",
                    hit.combined_score,
                    hit.keyword_score.unwrap_or(0.0),
                    hit.semantic_similarity.unwrap_or(0.0),
                    hit.key
                )
            })
        }
    }
}

fn run_similar(args: SimilarArgs, cli_args: &TesseraArgs) -> Result<()> {
    let (_storage, mut engine) = open_engine(&args.snapshot_dir)?;
    engine.attach_query_log_sink(
        std::sync::Arc::new(FileStorage::new(&args.snapshot_dir)?),
        QUERY_LOG_BLOB,
    );
    if args.ann {
        engine.rebuild_ann_now()?;
    }

    let key = ContentKey::new(ContentType::parse_str(&args.content_type)?, &args.id);
    let (hits, latency_ms) = timed(|| engine.find_similar(&key, args.limit));
    let hits = hits?;

    if let Some(id) = engine.record_query(QueryRecord {
        issued_by: None,
        query_text: key.to_string(),
        kind: QueryKind::Similar,
        applied_filters: Vec::new(),
        result_count: hits.len(),
        top_result: hits.first().map(|h| (h.key.clone(), h.similarity)),
        latency_ms,
    }) && cli_args.verbosity() > 1
    {
        println!("log entry: {id}");
    }

    print_hits(cli_args, latency_ms, &hits, |hit| {
        format!("{:8.4}  {}", hit.similarity, hit.key)
    })
}

fn run_remove(args: RemoveArgs, cli_args: &TesseraArgs) -> Result<()> {
    let (storage, engine) = open_engine(&args.snapshot_dir)?;
    let key = ContentKey::new(ContentType::parse_str(&args.content_type)?, &args.id);
    let removed = engine.remove(&key);
    engine.save_snapshot(&storage, SNAPSHOT_BLOB)?;

    if cli_args.verbosity() > 0 {
        if removed {
            println!("removed {key}");
        } else {
            println!("{key} was not indexed");
        }
    }
    Ok(())
}

fn run_stats(args: StatsArgs, cli_args: &TesseraArgs) -> Result<()> {
    let (_storage, engine) = open_engine(&args.snapshot_dir)?;
    let stats = engine.stats();

    match cli_args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Human => {
            println!("rows:          {}", stats.index.total_rows);
            println!("  with vector: {}", stats.index.vector_rows);
            println!("  with text:   {}", stats.index.lexical_rows);
            println!("terms:         {}", stats.index.terms);
            println!("ann coverage:  {}", stats.ann_covered_rows);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn log_query(
    engine: &SearchEngine,
    args: &SearchArgs,
    kind: QueryKind,
    query_text: &str,
    filters: &[FieldFilter],
    result_count: usize,
    top_result: Option<(ContentKey, f32)>,
    latency_ms: u64,
) {
    // Best-effort; the engine contains any logging failure.
    engine.record_query(QueryRecord {
        issued_by: args.issued_by.clone(),
        query_text: query_text.to_string(),
        kind,
        applied_filters: filters.to_vec(),
        result_count,
        top_result,
        latency_ms,
    });
}

fn print_hits<T: serde::Serialize>(
    cli_args: &TesseraArgs,
    latency_ms: u64,
    hits: &[T],
    format_hit: impl Fn(&T) -> String,
) -> Result<()> {
    match cli_args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(hits)?),
        OutputFormat::Human => {
            if hits.is_empty() {
                if cli_args.verbosity() > 0 {
                    println!("no results");
                }
            } else {
                for (rank, hit) in hits.iter().enumerate() {
                    println!("{:3}. {}", rank + 1, format_hit(hit));
                }
            }
            if cli_args.verbosity() > 1 {
                println!("({latency_ms} ms)");
            }
        }
    }
    Ok(())
}

fn parse_content_type(raw: Option<&str>) -> Result<Option<ContentType>> {
    raw.map(ContentType::parse_str).transpose()
}

fn parse_filters(raw: Option<&str>) -> Result<Vec<FieldFilter>> {
    match raw {
        Some(json) => Ok(serde_json::from_str(json)?),
        None => Ok(Vec::new()),
    }
}

fn parse_vector(raw: Option<&str>) -> Result<Vector> {
    let json = raw.ok_or_else(|| TesseraError::invalid_operation("--vector is required"))?;
    let data: Vec<f32> = serde_json::from_str(json)?;
    Ok(Vector::new(data))
}
