//! End-to-end scenarios through the engine facade.

use tessera::content::{ContentKey, ContentType, LexicalFields, Metadata, MetadataValue};
use tessera::engine::{EngineConfig, SearchEngine};
use tessera::error::TesseraError;
use tessera::filter::FieldFilter;
use tessera::hybrid::searcher::HybridSearchRequest;
use tessera::index::ContentUpdate;
use tessera::lexical::searcher::LexicalSearchRequest;
use tessera::querylog::{QueryKind, QueryRecord};
use tessera::vector::Vector;
use tessera::vector::searcher::SemanticSearchRequest;

const DIM: usize = 4;

fn engine() -> SearchEngine {
    SearchEngine::new(EngineConfig::new(DIM))
}

fn key(content_type: ContentType, id: &str) -> ContentKey {
    ContentKey::new(content_type, id)
}

fn doc_key(id: &str) -> ContentKey {
    key(ContentType::Document, id)
}

fn metadata(pairs: &[(&str, MetadataValue)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A corpus mixing vector-only, lexical-only, and dual-indexed items.
fn populate(engine: &SearchEngine) {
    engine
        .upsert(
            ContentUpdate::new(doc_key("handbook"))
                .vector(Vector::new(vec![1.0, 0.0, 0.0, 0.0]))
                .lexical(
                    LexicalFields::with_title("Member handbook")
                        .description("Benefits and enrollment basics")
                        .body("Everything a new member needs to know about enrollment")
                        .tags(["onboarding"]),
                )
                .metadata(metadata(&[("chapter", MetadataValue::from("TX"))])),
        )
        .unwrap();
    engine
        .upsert(
            ContentUpdate::new(doc_key("renewal-faq"))
                .vector(Vector::new(vec![0.9, 0.1, 0.0, 0.0]))
                .lexical(
                    LexicalFields::with_title("Renewal deadlines")
                        .description("When membership renewal is due"),
                )
                .metadata(metadata(&[("chapter", MetadataValue::from("CA"))])),
        )
        .unwrap();
    engine
        .upsert(
            ContentUpdate::new(key(ContentType::Event, "gala"))
                .lexical(LexicalFields::with_title("Annual gala").body("Networking dinner")),
        )
        .unwrap();
    engine
        .upsert(
            ContentUpdate::new(key(ContentType::Course, "ethics"))
                .vector(Vector::new(vec![0.0, 0.0, 1.0, 0.0])),
        )
        .unwrap();
}

#[test]
fn test_ordering_threshold_and_cap_invariants() {
    let engine = engine();
    populate(&engine);
    let query = Vector::new(vec![1.0, 0.0, 0.0, 0.0]);

    for limit in [0, 1, 2, 10] {
        let request = SemanticSearchRequest::new(limit).min_similarity(0.3);
        let hits = engine.semantic_search(&query, &request).unwrap();

        assert!(hits.len() <= limit);
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        for hit in &hits {
            assert!(hit.similarity >= 0.3);
        }
    }

    let hits = engine
        .lexical_search("membership enrollment", &LexicalSearchRequest::new(10))
        .unwrap();
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_upsert_is_idempotent_through_the_engine() {
    let engine = engine();
    let update = ContentUpdate::new(doc_key("dup"))
        .vector(Vector::new(vec![0.5, 0.5, 0.0, 0.0]))
        .lexical(LexicalFields::with_title("Duplicate check"))
        .metadata(metadata(&[("year", MetadataValue::from(2026.0))]));

    engine.upsert(update.clone()).unwrap();
    let first = engine.get(&doc_key("dup")).unwrap();
    engine.upsert(update).unwrap();
    let second = engine.get(&doc_key("dup")).unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.stats().index.total_rows, 1);
}

#[test]
fn test_find_similar_excludes_source_and_honors_limit() {
    let engine = engine();
    populate(&engine);

    let hits = engine.find_similar(&doc_key("handbook"), 10).unwrap();
    assert!(!hits.iter().any(|h| h.key == doc_key("handbook")));
    // No similarity floor: even the orthogonal course shows up.
    assert!(hits.iter().any(|h| h.key == key(ContentType::Course, "ethics")));

    let hits = engine.find_similar(&doc_key("handbook"), 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, doc_key("renewal-faq"));
}

#[test]
fn test_find_similar_without_embedding_is_an_error() {
    let engine = engine();
    populate(&engine);

    // Lexical-only item.
    let err = engine
        .find_similar(&key(ContentType::Event, "gala"), 5)
        .unwrap_err();
    assert!(matches!(err, TesseraError::EmbeddingNotFound(_)));

    // Never-indexed item.
    let err = engine.find_similar(&doc_key("ghost"), 5).unwrap_err();
    assert!(matches!(err, TesseraError::EmbeddingNotFound(_)));
}

#[test]
fn test_scenario_a_weighted_products_decide_order() {
    let engine = engine();

    // One item only close in vector space (similarity 0.95), one item with
    // only lexical overlap.
    let sim = 0.95_f32;
    let rest = (1.0 - sim * sim).sqrt();
    engine
        .upsert(
            ContentUpdate::new(doc_key("vec-only"))
                .vector(Vector::new(vec![sim, rest, 0.0, 0.0])),
        )
        .unwrap();
    engine
        .upsert(
            ContentUpdate::new(doc_key("lex-only"))
                .lexical(LexicalFields::with_title("Medicare enrollment checklist")),
        )
        .unwrap();

    let request = HybridSearchRequest::new(
        "medicare enrollment",
        Vector::new(vec![1.0, 0.0, 0.0, 0.0]),
    )
    .keyword_weight(0.5)
    .semantic_weight(0.5)
    .limit(10);
    let hits = engine.hybrid_search(&request).unwrap();
    assert_eq!(hits.len(), 2);

    let lex = hits.iter().find(|h| h.key == doc_key("lex-only")).unwrap();
    let vec = hits.iter().find(|h| h.key == doc_key("vec-only")).unwrap();

    // Each side's combined score is its own score times its weight.
    let lex_score = lex.keyword_score.unwrap();
    assert!((lex.combined_score - lex_score * 0.5).abs() < 1e-6);
    assert_eq!(lex.semantic_similarity, None);

    let vec_sim = vec.semantic_similarity.unwrap();
    assert!((vec_sim - 0.95).abs() < 1e-3);
    assert!((vec.combined_score - vec_sim * 0.5).abs() < 1e-6);
    assert_eq!(vec.keyword_score, None);

    // Ordering follows whichever product is larger.
    if lex.combined_score > vec.combined_score {
        assert_eq!(hits[0].key, doc_key("lex-only"));
    } else {
        assert_eq!(hits[0].key, doc_key("vec-only"));
    }
}

#[test]
fn test_scenario_b_dimension_mismatch_rejects_vector_but_not_prior_lexical() {
    let engine = engine();

    // Lexical side lands first, in its own upsert.
    engine
        .upsert(
            ContentUpdate::new(doc_key("partial"))
                .lexical(LexicalFields::with_title("Continuing education credits")),
        )
        .unwrap();

    // A wrong-dimension embedding is rejected outright.
    let err = engine
        .upsert(
            ContentUpdate::new(doc_key("partial"))
                .vector(Vector::new(vec![1.0; 10])),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TesseraError::DimensionMismatch {
            expected: DIM,
            actual: 10
        }
    ));

    // Absent from semantic results...
    let hits = engine
        .semantic_search(
            &Vector::new(vec![1.0, 0.0, 0.0, 0.0]),
            &SemanticSearchRequest::new(10),
        )
        .unwrap();
    assert!(!hits.iter().any(|h| h.key == doc_key("partial")));

    // ...but still reachable through the lexical side.
    let hits = engine
        .lexical_search("education credits", &LexicalSearchRequest::new(10))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, doc_key("partial"));
}

#[test]
fn test_scenario_c_click_on_unknown_entry_never_raises() {
    let engine = engine();
    populate(&engine);

    let id = engine
        .record_query(QueryRecord {
            issued_by: Some("m-100".to_string()),
            query_text: "gala".to_string(),
            kind: QueryKind::Lexical,
            applied_filters: Vec::new(),
            result_count: 1,
            top_result: None,
            latency_ms: 2,
        })
        .unwrap();

    engine.record_click(id, "gala");
    assert_eq!(engine.query_log().get(id).unwrap().clicked, vec!["gala"]);

    // Evict the entry by overflowing a tiny log.
    let tiny = SearchEngine::new(EngineConfig::new(DIM).query_log_capacity(1));
    let old = tiny
        .record_query(QueryRecord {
            issued_by: None,
            query_text: "one".to_string(),
            kind: QueryKind::Semantic,
            applied_filters: Vec::new(),
            result_count: 0,
            top_result: None,
            latency_ms: 1,
        })
        .unwrap();
    tiny.record_query(QueryRecord {
        issued_by: None,
        query_text: "two".to_string(),
        kind: QueryKind::Semantic,
        applied_filters: Vec::new(),
        result_count: 0,
        top_result: None,
        latency_ms: 1,
    })
    .unwrap();

    // Both calls are silent no-ops.
    tiny.record_click(old, "whatever");
    engine.record_click(id, "second-click");
}

#[test]
fn test_scenario_d_removal_disappears_from_every_entry_point() {
    let engine = engine();
    populate(&engine);
    let target = doc_key("handbook");
    let query_vector = Vector::new(vec![1.0, 0.0, 0.0, 0.0]);

    // Present everywhere first.
    let semantic = engine
        .semantic_search(&query_vector, &SemanticSearchRequest::new(10))
        .unwrap();
    assert!(semantic.iter().any(|h| h.key == target));
    let lexical = engine
        .lexical_search("handbook", &LexicalSearchRequest::new(10))
        .unwrap();
    assert!(lexical.iter().any(|h| h.key == target));
    let hybrid = engine
        .hybrid_search(&HybridSearchRequest::new("handbook", query_vector.clone()))
        .unwrap();
    assert!(hybrid.iter().any(|h| h.key == target));

    assert!(engine.remove(&target));

    let semantic = engine
        .semantic_search(&query_vector, &SemanticSearchRequest::new(10))
        .unwrap();
    assert!(!semantic.iter().any(|h| h.key == target));
    let lexical = engine
        .lexical_search("handbook", &LexicalSearchRequest::new(10))
        .unwrap();
    assert!(!lexical.iter().any(|h| h.key == target));
    let hybrid = engine
        .hybrid_search(&HybridSearchRequest::new("handbook", query_vector))
        .unwrap();
    assert!(!hybrid.iter().any(|h| h.key == target));
}

#[test]
fn test_content_type_and_metadata_filters() {
    let engine = engine();
    populate(&engine);
    let query = Vector::new(vec![1.0, 0.0, 0.0, 0.0]);

    let request = SemanticSearchRequest::new(10).content_type(ContentType::Course);
    let hits = engine.semantic_search(&query, &request).unwrap();
    assert!(hits.iter().all(|h| h.key.content_type == ContentType::Course));

    let request = SemanticSearchRequest::new(10).filters(vec![FieldFilter::Equals {
        key: "chapter".to_string(),
        value: MetadataValue::from("TX"),
    }]);
    let hits = engine.semantic_search(&query, &request).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, doc_key("handbook"));

    // Lexical entry point honors its content-type restriction.
    let hits = engine
        .lexical_search(
            "annual gala networking",
            &LexicalSearchRequest::new(10).content_type(ContentType::Document),
        )
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_queries_matching_nothing_return_empty_lists() {
    let engine = engine();
    populate(&engine);

    // No lexical overlap at all.
    let hits = engine
        .lexical_search("zzz unmatched", &LexicalSearchRequest::new(10))
        .unwrap();
    assert!(hits.is_empty());

    // Unindexed content type.
    let hits = engine
        .lexical_search(
            "handbook",
            &LexicalSearchRequest::new(10).content_type(ContentType::Article),
        )
        .unwrap();
    assert!(hits.is_empty());

    // All stop words.
    let hits = engine
        .lexical_search("the and of", &LexicalSearchRequest::new(10))
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_malformed_filters_are_rejected_before_the_query_runs() {
    let engine = engine();
    populate(&engine);
    let query = Vector::new(vec![1.0, 0.0, 0.0, 0.0]);

    let bad = vec![FieldFilter::Range {
        key: "year".to_string(),
        min: None,
        max: None,
    }];

    let err = engine
        .semantic_search(&query, &SemanticSearchRequest::new(10).filters(bad.clone()))
        .unwrap_err();
    assert!(matches!(err, TesseraError::InvalidFilter(_)));

    let err = engine
        .hybrid_search(&HybridSearchRequest::new("handbook", query).filters(bad))
        .unwrap_err();
    assert!(matches!(err, TesseraError::InvalidFilter(_)));
}
