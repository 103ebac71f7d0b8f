//! The search engine facade.
//!
//! [`SearchEngine`] wires the content index store, the two ranking engines,
//! the fusion merger, the recommendation path, the query log, and the ANN
//! maintenance worker into one handle. Query callers are assumed to be
//! already authorized for the content they request. No per-item permission
//! filtering happens here; pre-filter `content_type`/`filters` to scopes the
//! caller may see.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{Analyzer, StandardAnalyzer};
use crate::content::ContentKey;
use crate::error::{Result, TesseraError};
use crate::filter::{matches_all, validate_filters};
use crate::hybrid::merger::{KeywordCandidate, ResultMerger};
use crate::hybrid::scorer::ScoreNormalizer;
use crate::hybrid::searcher::{HybridHit, HybridSearchRequest};
use crate::index::snapshot;
use crate::index::{ContentIndexStore, ContentUpdate, IndexStats};
use crate::lexical::searcher::{Bm25Params, LexicalHit, LexicalSearchRequest, rank};
use crate::maintenance::{AnnState, RebuildWorker, rebuild};
use crate::querylog::{LogEntryId, QueryLog, QueryRecord};
use crate::recommend;
use crate::vector::Vector;
use crate::vector::hnsw::HnswConfig;
use crate::vector::searcher::{SemanticHit, SemanticSearchRequest, semantic_search};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The fixed embedding dimension; every ingested and queried vector must
    /// match it.
    pub dimension: usize,
    /// ANN graph parameters.
    pub hnsw: HnswConfig,
    /// BM25 parameters.
    pub bm25: Bm25Params,
    /// Multiplier applied to a semantic query's candidate budget to absorb
    /// post-graph filtering.
    pub ann_overfetch: usize,
    /// How many internal candidates each side of a hybrid query keeps before
    /// fusion, relative to the requested limit.
    pub fusion_candidate_multiplier: usize,
    /// Query-log retention, in entries.
    pub query_log_capacity: usize,
}

impl EngineConfig {
    /// Create a configuration for the given embedding dimension, with
    /// defaults for everything else.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            hnsw: HnswConfig::default(),
            bm25: Bm25Params::default(),
            ann_overfetch: 4,
            fusion_candidate_multiplier: 4,
            query_log_capacity: 10_000,
        }
    }

    /// Override the ANN parameters.
    pub fn hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.hnsw = hnsw;
        self
    }

    /// Override the BM25 parameters.
    pub fn bm25(mut self, bm25: Bm25Params) -> Self {
        self.bm25 = bm25;
        self
    }

    /// Override the query-log retention.
    pub fn query_log_capacity(mut self, capacity: usize) -> Self {
        self.query_log_capacity = capacity;
        self
    }

    /// The internal per-side candidate cap for a hybrid query: generous
    /// relative to the final limit so fusion has enough to re-rank.
    fn fusion_candidate_cap(&self, limit: usize) -> usize {
        limit.max(50).saturating_mul(self.fusion_candidate_multiplier.max(1))
    }
}

/// A point-in-time view of the engine's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Store counters.
    pub index: IndexStats,
    /// Rows covered by the installed ANN snapshot. The gap to
    /// `index.vector_rows` is the staleness window served by exact scans.
    pub ann_covered_rows: usize,
    /// When the installed ANN snapshot was built.
    pub ann_built_at: Option<DateTime<Utc>>,
    /// Entries currently retained in the query log.
    pub logged_queries: usize,
}

/// The hybrid content-search and recommendation engine.
///
/// All query methods are synchronous pure reads and safe to call from many
/// threads at once; ingestion interleaves freely with queries. Query logging
/// is caller-driven: execute a search, then hand the facts to
/// [`record_query`](Self::record_query). A failure there is contained and
/// never disturbs the search path.
#[derive(Debug)]
pub struct SearchEngine {
    config: EngineConfig,
    analyzer: StandardAnalyzer,
    store: Arc<ContentIndexStore>,
    ann: Arc<AnnState>,
    query_log: QueryLog,
    rebuild_worker: Option<RebuildWorker>,
}

impl SearchEngine {
    /// Create an engine with no background worker; ANN rebuilds happen only
    /// through [`rebuild_ann_now`](Self::rebuild_ann_now).
    pub fn new(config: EngineConfig) -> Self {
        let store = Arc::new(ContentIndexStore::new(config.dimension));
        Self::assemble(config, store, false).expect("no worker to spawn")
    }

    /// Create an engine with a background rebuild worker attached.
    pub fn with_background_rebuilds(config: EngineConfig) -> Result<Self> {
        let store = Arc::new(ContentIndexStore::new(config.dimension));
        Self::assemble(config, store, true)
    }

    /// Restore an engine from a store snapshot.
    ///
    /// The snapshot's dimension must match the configuration.
    pub fn from_snapshot(
        config: EngineConfig,
        storage: &dyn crate::storage::Storage,
        name: &str,
    ) -> Result<Self> {
        let store = snapshot::load(storage, name)?;
        if store.dimension() != config.dimension {
            return Err(TesseraError::DimensionMismatch {
                expected: config.dimension,
                actual: store.dimension(),
            });
        }
        Self::assemble(config, Arc::new(store), false)
    }

    /// Restore an engine from a store snapshot, taking the embedding
    /// dimension from the snapshot itself.
    pub fn open_snapshot(storage: &dyn crate::storage::Storage, name: &str) -> Result<Self> {
        let store = snapshot::load(storage, name)?;
        let config = EngineConfig::new(store.dimension());
        Self::assemble(config, Arc::new(store), false)
    }

    fn assemble(
        config: EngineConfig,
        store: Arc<ContentIndexStore>,
        background: bool,
    ) -> Result<Self> {
        let ann = Arc::new(AnnState::new());
        let rebuild_worker = if background {
            Some(
                RebuildWorker::spawn(store.clone(), ann.clone(), config.hnsw.clone())
                    .map_err(TesseraError::Io)?,
            )
        } else {
            None
        };
        Ok(Self {
            query_log: QueryLog::new(config.query_log_capacity),
            analyzer: StandardAnalyzer::new(),
            store,
            ann,
            rebuild_worker,
            config,
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- ingestion -------------------------------------------------------

    /// Insert or update one content item. See [`ContentIndexStore::upsert`].
    pub fn upsert(&self, update: ContentUpdate) -> Result<()> {
        self.store.upsert(&self.analyzer, update)
    }

    /// Remove one content item. Returns whether a row was removed.
    pub fn remove(&self, key: &ContentKey) -> bool {
        self.store.remove(key)
    }

    /// Fetch a copy of a stored row.
    pub fn get(&self, key: &ContentKey) -> Option<crate::index::StoredRow> {
        self.store.get(key)
    }

    // --- maintenance -----------------------------------------------------

    /// Ask the background worker for an ANN rebuild; falls back to a
    /// synchronous rebuild when the engine runs without a worker.
    pub fn request_ann_rebuild(&self) -> Result<()> {
        match &self.rebuild_worker {
            Some(worker) => {
                worker.trigger();
                Ok(())
            }
            None => self.rebuild_ann_now(),
        }
    }

    /// Rebuild the ANN graph on the calling thread and swap it in.
    pub fn rebuild_ann_now(&self) -> Result<()> {
        let snapshot = rebuild(&self.store, &self.config.hnsw)?;
        self.ann.install(snapshot);
        Ok(())
    }

    /// Persist the store as a snapshot blob.
    pub fn save_snapshot(
        &self,
        storage: &dyn crate::storage::Storage,
        name: &str,
    ) -> Result<()> {
        snapshot::save(&self.store, storage, name)
    }

    /// A point-in-time view of the engine's state.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            index: self.store.stats(),
            ann_covered_rows: self.ann.covered_rows(),
            ann_built_at: self.ann.current().map(|s| s.built_at),
            logged_queries: self.query_log.len(),
        }
    }

    // --- queries ---------------------------------------------------------

    /// Vector similarity search. Results are ordered by descending
    /// similarity, thresholded at the request's floor, capped at its limit.
    pub fn semantic_search(
        &self,
        query_vector: &Vector,
        request: &SemanticSearchRequest,
    ) -> Result<Vec<SemanticHit>> {
        let ann = self.ann.current();
        semantic_search(
            &self.store,
            ann.as_deref(),
            query_vector,
            request,
            None,
            self.config.ann_overfetch,
        )
    }

    /// Keyword search. Only items matching at least one query term return;
    /// an empty or all-stop-word query matches nothing.
    pub fn lexical_search(
        &self,
        query_text: &str,
        request: &LexicalSearchRequest,
    ) -> Result<Vec<LexicalHit>> {
        if request.limit == 0 {
            return Ok(Vec::new());
        }
        let terms = self.analyze_query(query_text)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.store.read();
        let scores = rank(&inner.inverted, &terms, &self.config.bm25);

        let mut hits: Vec<LexicalHit> = scores
            .into_iter()
            .filter_map(|(row_id, score)| {
                let row = inner.row_if_type(row_id, request.content_type)?;
                Some(LexicalHit {
                    key: row.key.clone(),
                    score,
                    title: row.title.clone(),
                    description: row.description.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        hits.truncate(request.limit);
        Ok(hits)
    }

    /// Hybrid search: both sides run independently with a generous internal
    /// candidate cap, then fuse. See the [`hybrid`](crate::hybrid) module for
    /// the scoring semantics.
    pub fn hybrid_search(&self, request: &HybridSearchRequest) -> Result<Vec<HybridHit>> {
        validate_filters(&request.filters)?;
        request
            .query_vector
            .validate_dimension(self.config.dimension)?;
        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let candidate_cap = self.config.fusion_candidate_cap(request.limit);
        let terms = self.analyze_query(&request.query_text)?;

        // Keyword side. The guard is scoped so the semantic side takes the
        // read lock on its own.
        let keyword: Vec<KeywordCandidate> = if terms.is_empty() {
            Vec::new()
        } else {
            let inner = self.store.read();
            let scores = rank(&inner.inverted, &terms, &self.config.bm25);
            let mut candidates: Vec<KeywordCandidate> = scores
                .into_iter()
                .filter_map(|(row_id, score)| {
                    let row = inner.row_if_type(row_id, request.content_type)?;
                    if !matches_all(&request.filters, &row.metadata) {
                        return None;
                    }
                    Some(KeywordCandidate {
                        key: row.key.clone(),
                        score,
                        metadata: row.metadata.clone(),
                    })
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.key.cmp(&b.key))
            });
            candidates.truncate(candidate_cap);
            candidates
        };

        // Semantic side, internally capped the same way, no floor.
        let semantic_request = SemanticSearchRequest {
            content_type: request.content_type,
            filters: request.filters.clone(),
            limit: candidate_cap,
            min_similarity: 0.0,
        };
        let ann = self.ann.current();
        let semantic = semantic_search(
            &self.store,
            ann.as_deref(),
            &request.query_vector,
            &semantic_request,
            None,
            self.config.ann_overfetch,
        )?;

        let merger = ResultMerger::new(
            request.keyword_weight,
            request.semantic_weight,
            ScoreNormalizer::new(request.normalization),
        );
        Ok(merger.merge(keyword, semantic, request.limit))
    }

    /// Nearest neighbors of a stored item, the item itself excluded.
    pub fn find_similar(&self, key: &ContentKey, limit: usize) -> Result<Vec<SemanticHit>> {
        let ann = self.ann.current();
        recommend::find_similar(
            &self.store,
            ann.as_deref(),
            key,
            limit,
            self.config.ann_overfetch,
        )
    }

    // --- query log -------------------------------------------------------

    /// Record one executed query.
    ///
    /// Never fails the caller: an internal logging error is warn-logged and
    /// reported as `None`.
    pub fn record_query(&self, record: QueryRecord) -> Option<LogEntryId> {
        match self.query_log.record_query(record) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("query logging failed: {e}");
                None
            }
        }
    }

    /// Append a clicked result to a logged query. Best-effort: unknown or
    /// evicted ids are silently ignored.
    pub fn record_click<S: Into<String>>(&self, id: LogEntryId, clicked_content_id: S) {
        self.query_log.record_click(id, clicked_content_id);
    }

    /// Persist every recorded query as a JSON line appended to `blob` in the
    /// given storage. See [`QueryLog::attach_sink`].
    pub fn attach_query_log_sink<S: Into<String>>(
        &mut self,
        storage: Arc<dyn crate::storage::Storage>,
        blob: S,
    ) {
        self.query_log.attach_sink(storage, blob);
    }

    /// The query log, for offline relevance analysis.
    pub fn query_log(&self) -> &QueryLog {
        &self.query_log
    }

    // --- helpers ---------------------------------------------------------

    fn analyze_query(&self, query_text: &str) -> Result<Vec<String>> {
        Ok(self
            .analyzer
            .analyze(query_text)?
            .map(|token| token.text)
            .collect())
    }
}

/// Convenience: time a closure, returning its result and the elapsed
/// milliseconds. Callers feed the latency into [`QueryRecord`].
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, u64) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed().as_millis() as u64)
}
