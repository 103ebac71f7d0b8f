//! The content index store.
//!
//! One row per searchable item, keyed by [`ContentKey`], holding the dense
//! vector and the analyzed lexical representation side by side. Either side
//! may be absent; the search entry points degrade to single-source ranking
//! for such rows. Re-indexing updates the row in place, never duplicates it.
//!
//! All query paths take the shared read lock; ingestion takes the write lock.
//! Concurrent upserts to the same key resolve last-writer-wins.

pub mod snapshot;

use ahash::AHashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::content::{ContentKey, ContentType, LexicalFields, Metadata};
use crate::error::Result;
use crate::lexical::inverted::{AnalyzedDocument, InvertedIndex};
use crate::lexical::analyze_fields;
use crate::vector::Vector;

/// An ingestion request for one content item.
///
/// `vector` and `lexical` may be supplied together or independently; a side
/// that is `None` leaves whatever the row already holds untouched, so the
/// embedding pipeline and the text pipeline can index at their own pace.
/// Metadata is replaced on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUpdate {
    /// The item's identity.
    pub key: ContentKey,
    /// The embedding produced by the external model call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vector>,
    /// Raw lexical fields, analyzed on ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexical: Option<LexicalFields>,
    /// Display and filter metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl ContentUpdate {
    /// Create an update carrying only a key and metadata.
    pub fn new(key: ContentKey) -> Self {
        Self {
            key,
            vector: None,
            lexical: None,
            metadata: Metadata::new(),
        }
    }

    /// Attach an embedding vector.
    pub fn vector(mut self, vector: Vector) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Attach lexical fields.
    pub fn lexical(mut self, fields: LexicalFields) -> Self {
        self.lexical = Some(fields);
        self
    }

    /// Attach metadata.
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    /// The item's identity.
    pub key: ContentKey,
    /// The stored embedding, if one has been supplied.
    pub vector: Option<Vector>,
    /// The analyzed lexical representation, if lexical fields were supplied.
    pub analyzed: Option<AnalyzedDocument>,
    /// Display title, captured from the lexical fields.
    pub title: Option<String>,
    /// Display description, captured from the lexical fields.
    pub description: Option<String>,
    /// Open metadata map.
    pub metadata: Metadata,
}

/// Counters describing the store's current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total rows.
    pub total_rows: usize,
    /// Rows holding a vector.
    pub vector_rows: usize,
    /// Rows holding a lexical representation.
    pub lexical_rows: usize,
    /// Distinct terms in the inverted index.
    pub terms: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StoreInner {
    pub(crate) rows: AHashMap<u64, StoredRow>,
    pub(crate) by_key: AHashMap<ContentKey, u64>,
    pub(crate) inverted: InvertedIndex,
    pub(crate) next_row_id: u64,
}

/// The durable table of indexed content.
#[derive(Debug)]
pub struct ContentIndexStore {
    dimension: usize,
    inner: RwLock<StoreInner>,
}

impl ContentIndexStore {
    /// Create an empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// The fixed vector dimension of this store.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert or update one content item.
    ///
    /// Idempotent: repeating a call with identical arguments leaves the row
    /// identical to a single call. A vector of the wrong dimension fails with
    /// [`DimensionMismatch`](crate::error::TesseraError::DimensionMismatch)
    /// and rejects the whole update; the prior row, including its lexical
    /// side, is preserved.
    pub fn upsert(&self, analyzer: &dyn Analyzer, update: ContentUpdate) -> Result<()> {
        // Validate and analyze before taking the write lock, so a rejected
        // update never observes or mutates store state.
        if let Some(vector) = &update.vector {
            vector.validate_dimension(self.dimension)?;
            if !vector.is_valid() {
                return Err(crate::error::TesseraError::invalid_operation(format!(
                    "vector for {} contains non-finite values",
                    update.key
                )));
            }
        }
        let analyzed = match &update.lexical {
            Some(fields) => Some(analyze_fields(analyzer, fields)?),
            None => None,
        };

        let mut inner = self.inner.write();
        let existing = inner.by_key.get(&update.key).copied();
        let row_id = match existing {
            Some(row_id) => row_id,
            None => {
                let row_id = inner.next_row_id;
                inner.next_row_id += 1;
                inner.by_key.insert(update.key.clone(), row_id);
                inner.rows.insert(
                    row_id,
                    StoredRow {
                        key: update.key.clone(),
                        vector: None,
                        analyzed: None,
                        title: None,
                        description: None,
                        metadata: Metadata::new(),
                    },
                );
                row_id
            }
        };

        if let Some(doc) = analyzed {
            if doc.is_empty() {
                inner.inverted.remove(row_id);
            } else {
                inner.inverted.insert(row_id, &doc);
            }
            let fields = update.lexical.as_ref().expect("analyzed implies lexical");
            let title = (!fields.title.is_empty()).then(|| fields.title.clone());
            let description =
                (!fields.description.is_empty()).then(|| fields.description.clone());
            let row = inner.rows.get_mut(&row_id).expect("row just ensured");
            row.analyzed = if doc.is_empty() { None } else { Some(doc) };
            row.title = title;
            row.description = description;
        }

        let row = inner.rows.get_mut(&row_id).expect("row just ensured");
        if let Some(vector) = update.vector {
            row.vector = Some(vector);
        }
        row.metadata = update.metadata;

        Ok(())
    }

    /// Remove one content item. Returns whether a row was removed.
    ///
    /// The row disappears from every query entry point on the next call; an
    /// ANN graph built earlier may still reference the row id, which the
    /// semantic searcher resolves against live rows and drops.
    pub fn remove(&self, key: &ContentKey) -> bool {
        let mut inner = self.inner.write();
        let Some(row_id) = inner.by_key.remove(key) else {
            return false;
        };
        inner.inverted.remove(row_id);
        inner.rows.remove(&row_id);
        true
    }

    /// Fetch a copy of a row.
    pub fn get(&self, key: &ContentKey) -> Option<StoredRow> {
        let inner = self.inner.read();
        let row_id = inner.by_key.get(key)?;
        inner.rows.get(row_id).cloned()
    }

    /// Current contents counters.
    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        IndexStats {
            total_rows: inner.rows.len(),
            vector_rows: inner.rows.values().filter(|r| r.vector.is_some()).count(),
            lexical_rows: inner.rows.values().filter(|r| r.analyzed.is_some()).count(),
            terms: inner.inverted.term_count(),
        }
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// True when the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }

    /// All `(row id, vector)` pairs, for ANN graph builds.
    pub(crate) fn vector_rows(&self) -> Vec<(u64, Vector)> {
        let inner = self.inner.read();
        let mut rows: Vec<(u64, Vector)> = inner
            .rows
            .iter()
            .filter_map(|(&row_id, row)| row.vector.clone().map(|v| (row_id, v)))
            .collect();
        // Deterministic build input regardless of hash-map iteration order.
        rows.sort_by_key(|(row_id, _)| *row_id);
        rows
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read()
    }

    /// Rebuild a store from decoded snapshot parts, restoring the inverted
    /// index from each row's analyzed document.
    pub(crate) fn from_snapshot_parts(
        dimension: usize,
        next_row_id: u64,
        rows: Vec<(u64, StoredRow)>,
    ) -> Self {
        let mut inner = StoreInner {
            next_row_id,
            ..Default::default()
        };
        for (row_id, row) in rows {
            if let Some(doc) = &row.analyzed {
                inner.inverted.insert(row_id, doc);
            }
            inner.by_key.insert(row.key.clone(), row_id);
            inner.rows.insert(row_id, row);
        }
        Self {
            dimension,
            inner: RwLock::new(inner),
        }
    }
}

impl StoreInner {
    /// Resolve a row id to its row, applying a content-type filter.
    pub(crate) fn row_if_type(
        &self,
        row_id: u64,
        content_type: Option<ContentType>,
    ) -> Option<&StoredRow> {
        let row = self.rows.get(&row_id)?;
        match content_type {
            Some(ct) if row.key.content_type != ct => None,
            _ => Some(row),
        }
    }
}
