//! Score normalization for hybrid fusion.

use serde::{Deserialize, Serialize};

/// Strategy for bringing the two score scales together before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// Keep raw scores. The lexical side is an unbounded BM25 score while
    /// similarity is bounded in `[0, 1]`, so the weighted sum is
    /// uncalibrated and the weights are tuning knobs, not probabilities.
    /// This is the historical behavior and the default.
    #[default]
    None,
    /// Min-max rescale each side to `[0, 1]` over the candidate set before
    /// weighting.
    MinMax,
}

/// Applies a [`ScoreNormalization`] to one side's scores in place.
#[derive(Debug, Clone, Copy)]
pub struct ScoreNormalizer {
    strategy: ScoreNormalization,
}

impl ScoreNormalizer {
    /// Create a normalizer for the given strategy.
    pub fn new(strategy: ScoreNormalization) -> Self {
        Self { strategy }
    }

    /// Normalize one side's scores in place.
    ///
    /// Min-max uses the side's own candidate set: `(score − min) / (max −
    /// min)`. A constant side (or a single candidate) is left unchanged, the
    /// range being degenerate.
    pub fn normalize(&self, scores: &mut [f32]) {
        match self.strategy {
            ScoreNormalization::None => {}
            ScoreNormalization::MinMax => {
                if scores.is_empty() {
                    return;
                }
                let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
                let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let range = max - min;
                if range > 0.0 {
                    for score in scores {
                        *score = (*score - min) / range;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_leaves_scores_untouched() {
        let normalizer = ScoreNormalizer::new(ScoreNormalization::None);
        let mut scores = vec![4.2, 0.3];
        normalizer.normalize(&mut scores);
        assert_eq!(scores, vec![4.2, 0.3]);
    }

    #[test]
    fn test_min_max_rescales_to_unit_interval() {
        let normalizer = ScoreNormalizer::new(ScoreNormalization::MinMax);
        let mut scores = vec![2.0, 6.0, 4.0];
        normalizer.normalize(&mut scores);
        assert_eq!(scores, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_degenerate_range_is_left_alone() {
        let normalizer = ScoreNormalizer::new(ScoreNormalization::MinMax);
        let mut scores = vec![3.0, 3.0];
        normalizer.normalize(&mut scores);
        assert_eq!(scores, vec![3.0, 3.0]);

        let mut single = vec![0.8];
        normalizer.normalize(&mut single);
        assert_eq!(single, vec![0.8]);

        let mut empty: Vec<f32> = vec![];
        normalizer.normalize(&mut empty);
        assert!(empty.is_empty());
    }
}
