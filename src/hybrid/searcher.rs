//! Hybrid search requests and results.

use crate::content::{ContentKey, ContentType, Metadata};
use crate::filter::FieldFilter;
use crate::hybrid::scorer::ScoreNormalization;
use crate::vector::Vector;

/// A hybrid search request combining query text and a query vector.
///
/// # Examples
///
/// ```
/// use tessera::hybrid::HybridSearchRequest;
/// use tessera::vector::Vector;
///
/// let request = HybridSearchRequest::new("medicare enrollment", Vector::new(vec![0.1; 8]))
///     .keyword_weight(0.7)
///     .semantic_weight(0.3)
///     .limit(20);
/// ```
#[derive(Debug, Clone)]
pub struct HybridSearchRequest {
    /// The keyword query, analyzed as a bag of terms.
    pub query_text: String,
    /// The query embedding, produced by the same external model as the
    /// indexed vectors.
    pub query_vector: Vector,
    /// Restrict results to one content type.
    pub content_type: Option<ContentType>,
    /// Metadata filter conjunction, applied to both sides before fusion.
    pub filters: Vec<FieldFilter>,
    /// Maximum number of fused results.
    pub limit: usize,
    /// Weight of the lexical score in the combined score.
    pub keyword_weight: f32,
    /// Weight of the semantic similarity in the combined score.
    pub semantic_weight: f32,
    /// Score normalization applied before weighting.
    pub normalization: ScoreNormalization,
}

impl HybridSearchRequest {
    /// Create a request with equal weights and a limit of 10.
    ///
    /// With both weights zero every combined score is zero and the order
    /// degenerates to the tie-break rule; callers wanting a meaningful
    /// ranking must keep at least one weight nonzero.
    pub fn new<S: Into<String>>(query_text: S, query_vector: Vector) -> Self {
        Self {
            query_text: query_text.into(),
            query_vector,
            content_type: None,
            filters: Vec::new(),
            limit: 10,
            keyword_weight: 0.5,
            semantic_weight: 0.5,
            normalization: ScoreNormalization::default(),
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

    /// Set the result cap.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the keyword weight.
    pub fn keyword_weight(mut self, weight: f32) -> Self {
        self.keyword_weight = weight;
        self
    }

    /// Set the semantic weight.
    pub fn semantic_weight(mut self, weight: f32) -> Self {
        self.semantic_weight = weight;
        self
    }

    /// Set the normalization strategy.
    pub fn normalization(mut self, normalization: ScoreNormalization) -> Self {
        self.normalization = normalization;
        self
    }
}

/// One fused search result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HybridHit {
    /// The matched item.
    pub key: ContentKey,
    /// Weighted combination of the two sides.
    pub combined_score: f32,
    /// Lexical score, `None` when the item matched no query term.
    pub keyword_score: Option<f32>,
    /// Semantic similarity, `None` when the item has no vector or fell
    /// outside the semantic candidate set.
    pub semantic_similarity: Option<f32>,
    /// The item's metadata.
    pub metadata: Metadata,
}
