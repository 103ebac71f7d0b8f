//! Semantic (vector) search over the content index store.
//!
//! The fast path goes through the last-built HNSW graph; rows ingested after
//! that build are covered by an exact scan, so fresh vectors are visible
//! before the next rebuild. Rows removed after the build may still sit in the
//! graph, so every graph hit is resolved against the live row table and
//! dropped if the row is gone.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::content::{ContentKey, ContentType, Metadata};
use crate::error::Result;
use crate::filter::{FieldFilter, matches_all, validate_filters};
use crate::index::ContentIndexStore;
use crate::vector::hnsw::HnswGraph;
use crate::vector::{Vector, cosine_similarity};

/// Rows below this count are scanned serially; the rayon fan-out costs more
/// than it saves.
const PARALLEL_SCAN_THRESHOLD: usize = 256;

/// An immutable ANN graph together with its build timestamp.
///
/// Built by the maintenance task and swapped in atomically; queries clone the
/// `Arc` and never block a rebuild.
#[derive(Debug)]
pub struct AnnSnapshot {
    /// The graph itself.
    pub graph: HnswGraph,
    /// When the build finished.
    pub built_at: DateTime<Utc>,
}

/// Parameters for a semantic search.
#[derive(Debug, Clone)]
pub struct SemanticSearchRequest {
    /// Restrict results to one content type.
    pub content_type: Option<ContentType>,
    /// Metadata filter conjunction; all predicates must match.
    pub filters: Vec<FieldFilter>,
    /// Maximum number of results.
    pub limit: usize,
    /// Exclude results below this similarity.
    pub min_similarity: f32,
}

impl SemanticSearchRequest {
    /// Create a request returning at most `limit` results.
    pub fn new(limit: usize) -> Self {
        Self {
            content_type: None,
            filters: Vec::new(),
            limit,
            min_similarity: 0.0,
        }
    }

    /// Restrict to one content type.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Add metadata filters.
    pub fn filters(mut self, filters: Vec<FieldFilter>) -> Self {
        self.filters = filters;
        self
    }

    /// Set the similarity floor.
    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// One semantic search result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SemanticHit {
    /// The matched item.
    pub key: ContentKey,
    /// Cosine similarity in `[0, 1]`.
    pub similarity: f32,
    /// The item's metadata.
    pub metadata: Metadata,
}

/// Execute a semantic search.
///
/// Results are ordered by descending similarity; equal similarities resolve
/// by ascending key, so repeated calls rank ties identically even though the
/// ANN tail itself is approximate. `exclude` drops one key from the results
/// (the recommendation path excludes the source item).
pub fn semantic_search(
    store: &ContentIndexStore,
    ann: Option<&AnnSnapshot>,
    query: &Vector,
    request: &SemanticSearchRequest,
    exclude: Option<&ContentKey>,
    ann_overfetch: usize,
) -> Result<Vec<SemanticHit>> {
    query.validate_dimension(store.dimension())?;
    validate_filters(&request.filters)?;
    if request.limit == 0 {
        return Ok(Vec::new());
    }

    let inner = store.read();
    let mut similarities: AHashMap<u64, f32> = AHashMap::new();

    let graph = ann.map(|snapshot| &snapshot.graph).filter(|g| !g.is_empty());
    if let Some(graph) = graph {
        // Over-fetch beyond the requested limit: content-type and metadata
        // filtering happens after the graph search, and every filtered-out
        // candidate would otherwise cost a result slot.
        let k = request.limit.max(16).saturating_mul(ann_overfetch.max(1));
        for (row_id, distance) in graph.search(&query.data, k, k) {
            similarities.insert(row_id, (1.0 - distance).clamp(0.0, 1.0));
        }
    }

    // Exact scan over whatever the graph does not cover: everything when
    // there is no graph, the post-build delta otherwise.
    let pending: Vec<(u64, &Vector)> = inner
        .rows
        .iter()
        .filter_map(|(&row_id, row)| {
            let vector = row.vector.as_ref()?;
            if graph.is_some_and(|g| g.contains(row_id)) {
                None
            } else {
                Some((row_id, vector))
            }
        })
        .collect();

    let scanned: Vec<(u64, f32)> = if pending.len() >= PARALLEL_SCAN_THRESHOLD {
        pending
            .par_iter()
            .map(|(row_id, vector)| (*row_id, cosine_similarity(&query.data, &vector.data)))
            .collect()
    } else {
        pending
            .iter()
            .map(|(row_id, vector)| (*row_id, cosine_similarity(&query.data, &vector.data)))
            .collect()
    };
    similarities.extend(scanned);

    let mut hits: Vec<SemanticHit> = similarities
        .into_iter()
        .filter(|(_, similarity)| *similarity >= request.min_similarity)
        .filter_map(|(row_id, similarity)| {
            let row = inner.row_if_type(row_id, request.content_type)?;
            if exclude == Some(&row.key) {
                return None;
            }
            if !matches_all(&request.filters, &row.metadata) {
                return None;
            }
            Some(SemanticHit {
                key: row.key.clone(),
                similarity,
                metadata: row.metadata.clone(),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    hits.truncate(request.limit);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::content::MetadataValue;
    use crate::index::ContentUpdate;
    use crate::vector::hnsw::HnswConfig;

    fn key(id: &str) -> ContentKey {
        ContentKey::new(ContentType::Document, id)
    }

    fn store_with_axes() -> ContentIndexStore {
        let analyzer = StandardAnalyzer::new();
        let store = ContentIndexStore::new(3);
        let axes = [
            ("x", vec![1.0, 0.0, 0.0]),
            ("y", vec![0.0, 1.0, 0.0]),
            ("z", vec![0.0, 0.0, 1.0]),
            ("xy", vec![0.7, 0.7, 0.0]),
        ];
        for (id, data) in axes {
            let mut metadata = Metadata::new();
            metadata.insert("axis".to_string(), MetadataValue::from(id));
            store
                .upsert(
                    &analyzer,
                    ContentUpdate::new(key(id))
                        .vector(Vector::new(data))
                        .metadata(metadata),
                )
                .unwrap();
        }
        store
    }

    fn query() -> Vector {
        Vector::new(vec![1.0, 0.0, 0.0])
    }

    #[test]
    fn test_exact_scan_orders_by_similarity() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(10);
        let hits = semantic_search(&store, None, &query(), &request, None, 4).unwrap();

        assert_eq!(hits[0].key, key("x"));
        assert_eq!(hits[1].key, key("xy"));
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_min_similarity_floor() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(10).min_similarity(0.5);
        let hits = semantic_search(&store, None, &query(), &request, None, 4).unwrap();

        assert!(!hits.is_empty());
        for hit in &hits {
            assert!(hit.similarity >= 0.5);
        }
        assert!(!hits.iter().any(|h| h.key == key("y")));
    }

    #[test]
    fn test_limit_caps_results() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(2);
        let hits = semantic_search(&store, None, &query(), &request, None, 4).unwrap();
        assert_eq!(hits.len(), 2);

        let request = SemanticSearchRequest::new(0);
        let hits = semantic_search(&store, None, &query(), &request, None, 4).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_metadata_filter_excludes_before_ranking() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(10).filters(vec![FieldFilter::Equals {
            key: "axis".to_string(),
            value: MetadataValue::from("y"),
        }]);
        let hits = semantic_search(&store, None, &query(), &request, None, 4).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, key("y"));
    }

    #[test]
    fn test_invalid_filter_is_rejected_before_search() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(10).filters(vec![FieldFilter::AnyOf {
            key: "axis".to_string(),
            values: vec![],
        }]);
        let err = semantic_search(&store, None, &query(), &request, None, 4).unwrap_err();
        assert!(matches!(err, crate::error::TesseraError::InvalidFilter(_)));
    }

    #[test]
    fn test_wrong_dimension_query_is_rejected() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(10);
        let bad = Vector::new(vec![1.0, 0.0]);
        assert!(semantic_search(&store, None, &bad, &request, None, 4).is_err());
    }

    #[test]
    fn test_ann_snapshot_with_delta_rows() {
        let analyzer = StandardAnalyzer::new();
        let store = store_with_axes();

        // Build a graph over the current rows, then ingest one more.
        let snapshot = AnnSnapshot {
            graph: HnswGraph::build(3, HnswConfig::default(), store.vector_rows()).unwrap(),
            built_at: Utc::now(),
        };
        store
            .upsert(
                &analyzer,
                ContentUpdate::new(key("fresh")).vector(Vector::new(vec![0.95, 0.05, 0.0])),
            )
            .unwrap();

        let request = SemanticSearchRequest::new(10);
        let hits =
            semantic_search(&store, Some(&snapshot), &query(), &request, None, 4).unwrap();

        // The fresh row is visible through the exact delta scan.
        let keys: Vec<&ContentKey> = hits.iter().map(|h| &h.key).collect();
        assert!(keys.contains(&&key("fresh")));
        assert_eq!(hits[0].key, key("x"));
    }

    #[test]
    fn test_removed_row_is_dropped_even_if_still_in_graph() {
        let store = store_with_axes();
        let snapshot = AnnSnapshot {
            graph: HnswGraph::build(3, HnswConfig::default(), store.vector_rows()).unwrap(),
            built_at: Utc::now(),
        };
        store.remove(&key("x"));

        let request = SemanticSearchRequest::new(10);
        let hits =
            semantic_search(&store, Some(&snapshot), &query(), &request, None, 4).unwrap();
        assert!(!hits.iter().any(|h| h.key == key("x")));
    }

    #[test]
    fn test_exclude_drops_source_item() {
        let store = store_with_axes();
        let request = SemanticSearchRequest::new(10);
        let exclude = key("x");
        let hits =
            semantic_search(&store, None, &query(), &request, Some(&exclude), 4).unwrap();
        assert!(!hits.iter().any(|h| h.key == exclude));
    }
}
