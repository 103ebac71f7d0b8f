//! Item-to-item recommendations.
//!
//! "More like this" is semantic search with the source item's own stored
//! vector as the query: the full ranked neighborhood comes back, least
//! similar included, with the source item itself excluded. There is no
//! meaningful fallback for an item that was never embedded, so that case is a
//! hard error rather than an empty list.

use crate::content::ContentKey;
use crate::error::{Result, TesseraError};
use crate::index::ContentIndexStore;
use crate::vector::searcher::{AnnSnapshot, SemanticHit, SemanticSearchRequest, semantic_search};

/// Find the nearest neighbors of a stored item.
///
/// Fails with [`EmbeddingNotFound`](TesseraError::EmbeddingNotFound) when the
/// item has no row or no stored vector. No similarity floor is applied.
pub fn find_similar(
    store: &ContentIndexStore,
    ann: Option<&AnnSnapshot>,
    key: &ContentKey,
    limit: usize,
    ann_overfetch: usize,
) -> Result<Vec<SemanticHit>> {
    let vector = store
        .get(key)
        .and_then(|row| row.vector)
        .ok_or_else(|| TesseraError::EmbeddingNotFound(key.clone()))?;

    let request = SemanticSearchRequest::new(limit);
    semantic_search(store, ann, &vector, &request, Some(key), ann_overfetch)
}
