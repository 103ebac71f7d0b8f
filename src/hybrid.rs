//! Hybrid search: fusing lexical and semantic rankings.
//!
//! The two sides run independently, each with a generous internal candidate
//! cap, and meet in a full outer join keyed by content key. The combined
//! score is a weighted linear sum; a side that did not match contributes
//! zero, so single-source items still rank.
//!
//! The raw scores live on different scales (BM25 is unbounded, similarity is
//! `[0, 1]`), and the default [`ScoreNormalization::None`] deliberately
//! preserves that uncalibrated sum for compatibility with the weights callers
//! have already tuned. Opt into [`ScoreNormalization::MinMax`] to rescale
//! both sides to `[0, 1]` before weighting.

pub mod merger;
pub mod scorer;
pub mod searcher;

pub use merger::ResultMerger;
pub use scorer::{ScoreNormalization, ScoreNormalizer};
pub use searcher::{HybridHit, HybridSearchRequest};
