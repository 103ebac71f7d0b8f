//! BM25 scoring over the inverted index.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::content::{ContentKey, ContentType};
use crate::lexical::inverted::InvertedIndex;

/// Parameters for a lexical search.
#[derive(Debug, Clone)]
pub struct LexicalSearchRequest {
    /// Restrict results to one content type.
    pub content_type: Option<ContentType>,
    /// Maximum number of results.
    pub limit: usize,
}

impl LexicalSearchRequest {
    /// Create a request returning at most `limit` results.
    pub fn new(limit: usize) -> Self {
        Self {
            content_type: None,
            limit,
        }
    }

    /// Restrict to one content type.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// One lexical search result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LexicalHit {
    /// The matched item.
    pub key: ContentKey,
    /// BM25 relevance score.
    pub score: f32,
    /// Display title, when the item has one.
    pub title: Option<String>,
    /// Display description, when the item has one.
    pub description: Option<String>,
}

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation point.
    pub k1: f32,
    /// Length-normalization strength.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Params {
    /// IDF for a term with document frequency `doc_freq` in a corpus of
    /// `total_docs` rows.
    ///
    /// Uses the `ln(1 + …)` form, which stays positive even for terms
    /// present in most of the corpus; with a handful of indexed rows the
    /// plain log would zero out every score.
    fn idf(&self, doc_freq: usize, total_docs: usize) -> f32 {
        if doc_freq == 0 || total_docs == 0 {
            return 0.0;
        }
        let n = total_docs as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Saturating term-frequency component for one row.
    fn tf(&self, term_freq: f32, doc_length: f32, avg_length: f32) -> f32 {
        if term_freq <= 0.0 {
            return 0.0;
        }
        let norm = if avg_length > 0.0 {
            1.0 - self.b + self.b * (doc_length / avg_length)
        } else {
            1.0
        };
        (term_freq * (self.k1 + 1.0)) / (term_freq + self.k1 * norm)
    }
}

/// Score every row matching at least one query term.
///
/// Query terms are treated as a bag: duplicates are collapsed, so repeating a
/// term does not compound its contribution. Rows matching no term are absent
/// from the result, never included with a zero score.
pub fn rank(index: &InvertedIndex, terms: &[String], params: &Bm25Params) -> AHashMap<u64, f32> {
    let mut scores: AHashMap<u64, f32> = AHashMap::new();
    let total_docs = index.doc_count();
    let avg_length = index.avg_length();

    let mut seen: Vec<&str> = Vec::with_capacity(terms.len());
    for term in terms {
        if seen.contains(&term.as_str()) {
            continue;
        }
        seen.push(term);

        let Some(postings) = index.postings(term) else {
            continue;
        };
        let idf = params.idf(postings.len(), total_docs);

        for (&row_id, &term_freq) in postings {
            let doc_length = index.doc_length(row_id).unwrap_or(avg_length);
            let contribution = idf * params.tf(term_freq, doc_length, avg_length);
            *scores.entry(row_id).or_insert(0.0) += contribution;
        }
    }

    scores
}
