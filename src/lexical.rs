//! Lexical (keyword) ranking over an inverted index.
//!
//! Lexical fields are weighted by field at analysis time (title counts most,
//! then description, then body, tags least) and scored with BM25-style
//! term-frequency saturation at query time. Only items matching at least one
//! query term are ever returned.

pub mod inverted;
pub mod searcher;

pub use inverted::{AnalyzedDocument, InvertedIndex};
pub use searcher::Bm25Params;

use ahash::AHashMap;

use crate::analysis::Analyzer;
use crate::content::LexicalFields;
use crate::error::Result;

/// Scoring weight of the title field.
pub const TITLE_WEIGHT: f32 = 3.0;
/// Scoring weight of the description field.
pub const DESCRIPTION_WEIGHT: f32 = 2.0;
/// Scoring weight of the body field.
pub const BODY_WEIGHT: f32 = 1.0;
/// Scoring weight of the tags field.
pub const TAGS_WEIGHT: f32 = 0.5;

/// Run lexical fields through the analyzer, folding field weights into the
/// per-term frequencies.
pub fn analyze_fields(analyzer: &dyn Analyzer, fields: &LexicalFields) -> Result<AnalyzedDocument> {
    let mut term_weights: AHashMap<String, f32> = AHashMap::new();
    let mut length = 0.0_f32;

    let mut accumulate = |text: &str, weight: f32| -> Result<()> {
        for token in analyzer.analyze(text)? {
            *term_weights.entry(token.text).or_insert(0.0) += weight;
            length += weight;
        }
        Ok(())
    };

    accumulate(&fields.title, TITLE_WEIGHT)?;
    accumulate(&fields.description, DESCRIPTION_WEIGHT)?;
    accumulate(&fields.body, BODY_WEIGHT)?;
    for tag in &fields.tags {
        accumulate(tag, TAGS_WEIGHT)?;
    }

    Ok(AnalyzedDocument {
        term_weights,
        length,
    })
}
