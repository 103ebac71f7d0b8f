//! Fusing the two ranked lists into one.

use ahash::AHashMap;

use crate::content::{ContentKey, Metadata};
use crate::hybrid::scorer::ScoreNormalizer;
use crate::hybrid::searcher::HybridHit;
use crate::vector::searcher::SemanticHit;

/// One lexical candidate entering fusion.
#[derive(Debug, Clone)]
pub struct KeywordCandidate {
    /// The matched item.
    pub key: ContentKey,
    /// Raw BM25 score.
    pub score: f32,
    /// The item's metadata.
    pub metadata: Metadata,
}

/// Merges keyword and semantic candidates into fused, ranked hits.
#[derive(Debug, Clone, Copy)]
pub struct ResultMerger {
    keyword_weight: f32,
    semantic_weight: f32,
    normalizer: ScoreNormalizer,
}

impl ResultMerger {
    /// Create a merger with the given weights and normalizer.
    pub fn new(keyword_weight: f32, semantic_weight: f32, normalizer: ScoreNormalizer) -> Self {
        Self {
            keyword_weight,
            semantic_weight,
            normalizer,
        }
    }

    /// Full outer join on content key, weighted sum, rank, truncate.
    ///
    /// A side an item is missing from contributes zero to its combined score.
    /// Ordering is combined score descending, ties broken by semantic
    /// similarity descending, then ascending key.
    pub fn merge(
        &self,
        mut keyword: Vec<KeywordCandidate>,
        mut semantic: Vec<SemanticHit>,
        limit: usize,
    ) -> Vec<HybridHit> {
        // Normalize each side over its own candidate set.
        let mut keyword_scores: Vec<f32> = keyword.iter().map(|c| c.score).collect();
        self.normalizer.normalize(&mut keyword_scores);
        for (candidate, score) in keyword.iter_mut().zip(&keyword_scores) {
            candidate.score = *score;
        }

        let mut semantic_scores: Vec<f32> = semantic.iter().map(|h| h.similarity).collect();
        self.normalizer.normalize(&mut semantic_scores);
        for (hit, score) in semantic.iter_mut().zip(&semantic_scores) {
            hit.similarity = *score;
        }

        let mut fused: AHashMap<ContentKey, HybridHit> = AHashMap::new();

        for candidate in keyword {
            fused.insert(
                candidate.key.clone(),
                HybridHit {
                    key: candidate.key,
                    combined_score: 0.0,
                    keyword_score: Some(candidate.score),
                    semantic_similarity: None,
                    metadata: candidate.metadata,
                },
            );
        }

        for hit in semantic {
            if let Some(existing) = fused.get_mut(&hit.key) {
                existing.semantic_similarity = Some(hit.similarity);
            } else {
                fused.insert(
                    hit.key.clone(),
                    HybridHit {
                        key: hit.key,
                        combined_score: 0.0,
                        keyword_score: None,
                        semantic_similarity: Some(hit.similarity),
                        metadata: hit.metadata,
                    },
                );
            }
        }

        let mut hits: Vec<HybridHit> = fused
            .into_values()
            .map(|mut hit| {
                let keyword_component = hit.keyword_score.unwrap_or(0.0) * self.keyword_weight;
                let semantic_component =
                    hit.semantic_similarity.unwrap_or(0.0) * self.semantic_weight;
                hit.combined_score = keyword_component + semantic_component;
                hit
            })
            .collect();

        hits.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.semantic_similarity
                        .unwrap_or(0.0)
                        .partial_cmp(&a.semantic_similarity.unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.key.cmp(&b.key))
        });
        hits.truncate(limit);
        hits
    }
}
