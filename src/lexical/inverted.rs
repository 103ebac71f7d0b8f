//! The inverted index mapping terms to the rows containing them.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// The analyzed lexical representation of one row: weighted term frequencies
/// plus the weighted document length used for BM25 length normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedDocument {
    /// Field-weighted frequency per term.
    pub term_weights: AHashMap<String, f32>,
    /// Sum of all weighted frequencies.
    pub length: f32,
}

impl AnalyzedDocument {
    /// True when no term survived analysis.
    pub fn is_empty(&self) -> bool {
        self.term_weights.is_empty()
    }
}

/// An in-memory inverted index over analyzed rows.
///
/// Rows are keyed by the store's internal row id. Inserting a row that is
/// already present replaces its postings; the caller does not need to remove
/// first.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    /// term → (row id → weighted term frequency).
    postings: AHashMap<String, AHashMap<u64, f32>>,
    /// row id → weighted document length.
    doc_lengths: AHashMap<u64, f32>,
    /// Terms per row, kept so removal does not scan every posting list.
    row_terms: AHashMap<u64, Vec<String>>,
    /// Running sum of all document lengths.
    total_length: f64,
}

impl InvertedIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row's postings.
    pub fn insert(&mut self, row_id: u64, doc: &AnalyzedDocument) {
        self.remove(row_id);

        let mut terms = Vec::with_capacity(doc.term_weights.len());
        for (term, &weight) in &doc.term_weights {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(row_id, weight);
            terms.push(term.clone());
        }
        self.row_terms.insert(row_id, terms);
        self.doc_lengths.insert(row_id, doc.length);
        self.total_length += doc.length as f64;
    }

    /// Remove a row's postings. Removing an absent row is a no-op.
    pub fn remove(&mut self, row_id: u64) {
        let Some(terms) = self.row_terms.remove(&row_id) else {
            return;
        };
        for term in terms {
            if let Some(rows) = self.postings.get_mut(&term) {
                rows.remove(&row_id);
                if rows.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        if let Some(length) = self.doc_lengths.remove(&row_id) {
            self.total_length -= length as f64;
        }
    }

    /// Number of indexed rows.
    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Average weighted document length, or 0 for an empty index.
    pub fn avg_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            (self.total_length / self.doc_lengths.len() as f64) as f32
        }
    }

    /// Number of rows containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, |rows| rows.len())
    }

    /// The posting list for `term`: row id → weighted term frequency.
    pub fn postings(&self, term: &str) -> Option<&AHashMap<u64, f32>> {
        self.postings.get(term)
    }

    /// The weighted length of a row, if indexed.
    pub fn doc_length(&self, row_id: u64) -> Option<f32> {
        self.doc_lengths.get(&row_id).copied()
    }
}
