//! Fusion semantics through the engine facade.

use tessera::content::{ContentKey, ContentType, LexicalFields};
use tessera::engine::{EngineConfig, SearchEngine};
use tessera::hybrid::scorer::ScoreNormalization;
use tessera::hybrid::searcher::HybridSearchRequest;
use tessera::index::ContentUpdate;
use tessera::vector::Vector;

const DIM: usize = 4;

fn key(id: &str) -> ContentKey {
    ContentKey::new(ContentType::Article, id)
}

fn engine_with_corpus() -> SearchEngine {
    let engine = SearchEngine::new(EngineConfig::new(DIM));
    engine
        .upsert(
            ContentUpdate::new(key("dual"))
                .vector(Vector::new(vec![0.8, 0.6, 0.0, 0.0]))
                .lexical(LexicalFields::with_title("Claims process overview")),
        )
        .unwrap();
    engine
        .upsert(
            ContentUpdate::new(key("lex-only"))
                .lexical(
                    LexicalFields::with_title("Claims appeal letters")
                        .body("Templates for claims appeals"),
                ),
        )
        .unwrap();
    engine
        .upsert(
            ContentUpdate::new(key("sem-only"))
                .vector(Vector::new(vec![1.0, 0.0, 0.0, 0.0])),
        )
        .unwrap();
    engine
}

fn request(text: &str) -> HybridSearchRequest {
    HybridSearchRequest::new(text, Vector::new(vec![1.0, 0.0, 0.0, 0.0])).limit(10)
}

#[test]
fn test_fusion_consistency_for_single_source_items() {
    let engine = engine_with_corpus();
    let hits = engine.hybrid_search(&request("claims")).unwrap();

    // Lexical-only item: no semantic contribution.
    let lex = hits.iter().find(|h| h.key == key("lex-only")).unwrap();
    assert_eq!(lex.semantic_similarity, None);
    assert!((lex.combined_score - lex.keyword_score.unwrap() * 0.5).abs() < 1e-6);

    // Semantic-only item: no keyword contribution, symmetric.
    let sem = hits.iter().find(|h| h.key == key("sem-only")).unwrap();
    assert_eq!(sem.keyword_score, None);
    assert!((sem.combined_score - sem.semantic_similarity.unwrap() * 0.5).abs() < 1e-6);

    // The dual item carries both components.
    let dual = hits.iter().find(|h| h.key == key("dual")).unwrap();
    assert!(dual.keyword_score.is_some());
    assert!(dual.semantic_similarity.is_some());
}

#[test]
fn test_combined_scores_are_non_increasing() {
    let engine = engine_with_corpus();
    let hits = engine.hybrid_search(&request("claims appeal")).unwrap();

    assert!(!hits.is_empty());
    for pair in hits.windows(2) {
        assert!(pair[0].combined_score >= pair[1].combined_score);
    }
}

#[test]
fn test_weights_steer_the_ranking() {
    let engine = engine_with_corpus();

    // All keyword: the best lexical match wins.
    let hits = engine
        .hybrid_search(&request("claims appeal").keyword_weight(1.0).semantic_weight(0.0))
        .unwrap();
    assert_eq!(hits[0].key, key("lex-only"));

    // All semantic: the exact vector match wins.
    let hits = engine
        .hybrid_search(&request("claims appeal").keyword_weight(0.0).semantic_weight(1.0))
        .unwrap();
    assert_eq!(hits[0].key, key("sem-only"));
}

#[test]
fn test_zero_weights_degenerate_to_tie_break_order() {
    let engine = engine_with_corpus();
    let hits = engine
        .hybrid_search(&request("claims").keyword_weight(0.0).semantic_weight(0.0))
        .unwrap();

    assert!(!hits.is_empty());
    for hit in &hits {
        assert_eq!(hit.combined_score, 0.0);
    }
    // Ties resolve by semantic similarity descending, then key.
    for pair in hits.windows(2) {
        let a = pair[0].semantic_similarity.unwrap_or(0.0);
        let b = pair[1].semantic_similarity.unwrap_or(0.0);
        assert!(a > b || (a == b && pair[0].key < pair[1].key));
    }
}

#[test]
fn test_min_max_normalization_bounds_both_sides() {
    let engine = engine_with_corpus();
    let hits = engine
        .hybrid_search(&request("claims appeal").normalization(ScoreNormalization::MinMax))
        .unwrap();

    for hit in &hits {
        if let Some(score) = hit.keyword_score {
            assert!((0.0..=1.0).contains(&score));
        }
        if let Some(similarity) = hit.semantic_similarity {
            assert!((0.0..=1.0).contains(&similarity));
        }
        assert!(hit.combined_score <= 1.0);
    }
}

#[test]
fn test_limit_truncates_after_fusion() {
    let engine = engine_with_corpus();
    let hits = engine.hybrid_search(&request("claims").limit(2)).unwrap();
    assert_eq!(hits.len(), 2);

    let hits = engine.hybrid_search(&request("claims").limit(0)).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_fusion_sees_candidates_beyond_the_final_limit() {
    // Fill the corpus with lexical decoys, then check that an item ranked
    // poorly on the lexical side still surfaces when its semantic score
    // carries it: each side's internal candidate cap must exceed the final
    // limit.
    let engine = SearchEngine::new(EngineConfig::new(DIM));
    for i in 0..30 {
        engine
            .upsert(
                ContentUpdate::new(key(&format!("decoy-{i:02}")))
                    .lexical(
                        LexicalFields::with_title("Claims bulletin")
                            .body("claims claims claims update"),
                    ),
            )
            .unwrap();
    }
    engine
        .upsert(
            ContentUpdate::new(key("sleeper"))
                .vector(Vector::new(vec![1.0, 0.0, 0.0, 0.0]))
                .lexical(LexicalFields::with_title("Claims").body("claims")),
        )
        .unwrap();

    let hits = engine
        .hybrid_search(
            &request("claims")
                .limit(5)
                .keyword_weight(0.1)
                .semantic_weight(0.9),
        )
        .unwrap();

    assert_eq!(hits.len(), 5);
    assert_eq!(hits[0].key, key("sleeper"));
}

#[test]
fn test_empty_query_text_degrades_to_semantic_ranking() {
    let engine = engine_with_corpus();
    let hits = engine.hybrid_search(&request("")).unwrap();

    // No lexical candidates at all; the semantic side still ranks.
    assert!(!hits.is_empty());
    for hit in &hits {
        assert_eq!(hit.keyword_score, None);
    }
    assert_eq!(hits[0].key, key("sem-only"));
}
