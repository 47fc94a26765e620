//! Tests for retrieval ranking correctness.

use crate::types::Chunk;
use crate::vector_index::{LoadOutcome, VectorIndex};
use tempfile::TempDir;

/// Helper to create a test chunk.
fn create_test_chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        document: "source1.txt".to_string(),
        position: 0,
        start: 0,
        end: text.chars().count(),
        text: text.to_string(),
    }
}

/// Helper to create a normalized embedding.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn build(pairs: Vec<(Chunk, Vec<f32>)>) -> VectorIndex {
    let (chunks, embeddings) = pairs.into_iter().unzip();
    VectorIndex::build("test-model", chunks, embeddings).unwrap()
}

#[test]
fn test_relevant_query_returns_high_scores() {
    // Query will be about "rust programming"
    let index = build(vec![
        (
            create_test_chunk("chunk1", "Rust is a systems programming language"),
            normalize(&[1.0, 0.5, 0.2, 0.1]),
        ),
        (
            create_test_chunk("chunk2", "Cooking recipes for pasta"),
            normalize(&[-0.3, -0.8, 0.4, -0.2]),
        ),
    ]);

    let query_embedding = normalize(&[0.9, 0.4, 0.3, 0.1]);
    let results = index.search(&query_embedding, 5).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, "chunk1", "Most relevant chunk should be first");
    assert!(
        results[0].1 > 0.8,
        "Relevant chunk score should be high: {}",
        results[0].1
    );
    assert!(results[0].1 > results[1].1, "Scores should be ordered");
}

#[test]
fn test_unrelated_query_returns_low_scores() {
    let index = build(vec![(
        create_test_chunk("chunk1", "Rust programming language features"),
        normalize(&[1.0, 0.0, 0.0, 0.0]),
    )]);

    // Orthogonal query
    let results = index.search(&normalize(&[0.0, 1.0, 0.0, 0.0]), 5).unwrap();

    assert_eq!(results.len(), 1);
    assert!(
        results[0].1 < 0.5,
        "Unrelated chunk score should be low: {}",
        results[0].1
    );
}

#[test]
fn test_scores_are_ordered_descending() {
    let index = build(vec![
        (create_test_chunk("chunk1", "Text A"), normalize(&[1.0, 0.0, 0.0])),
        (create_test_chunk("chunk2", "Text B"), normalize(&[0.7, 0.7, 0.0])),
        (create_test_chunk("chunk3", "Text C"), normalize(&[0.0, 1.0, 0.0])),
        (create_test_chunk("chunk4", "Text D"), normalize(&[-1.0, 0.0, 0.0])),
    ]);

    let results = index.search(&normalize(&[1.0, 0.0, 0.0]), 10).unwrap();

    for i in 1..results.len() {
        assert!(
            results[i - 1].1 >= results[i].1,
            "Scores should be ordered: {} >= {}",
            results[i - 1].1,
            results[i].1
        );
    }

    assert_eq!(results[0].0.id, "chunk1");
    assert!(results[0].1 > 0.99, "Perfect match should have score near 1.0");
    assert_eq!(results[3].0.id, "chunk4");
    assert!(results[3].1 < -0.99, "Opposite vector should score near -1.0");
}

#[test]
fn test_ties_keep_insertion_order() {
    let same = normalize(&[0.5, 0.5, 0.0]);
    let index = build(vec![
        (create_test_chunk("first", "A"), same.clone()),
        (create_test_chunk("second", "B"), same.clone()),
        (create_test_chunk("third", "C"), same.clone()),
    ]);

    let ids: Vec<String> = index
        .search(&same, 3)
        .unwrap()
        .into_iter()
        .map(|(chunk, _)| chunk.id)
        .collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn test_top_k_bounds() {
    let index = build(vec![
        (create_test_chunk("a", "A"), vec![1.0, 0.0]),
        (create_test_chunk("b", "B"), vec![0.0, 1.0]),
    ]);

    assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    assert_eq!(index.search(&[1.0, 0.0], 50).unwrap().len(), 2);
    assert_eq!(index.search(&[1.0, 0.0], 1).unwrap()[0].0.id, "a");
}

#[test]
fn test_persisted_index_preserves_ranking() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("index_test-model/index.sqlite");

    let index = build(vec![
        (create_test_chunk("chunk1", "Text A"), normalize(&[1.0, 0.2, 0.0])),
        (create_test_chunk("chunk2", "Text B"), normalize(&[0.3, 1.0, 0.1])),
        (create_test_chunk("chunk3", "Text C"), normalize(&[0.0, 0.2, 1.0])),
        (create_test_chunk("chunk4", "Text D"), normalize(&[0.6, 0.6, 0.6])),
    ]);
    index.persist(&path).unwrap();

    let loaded = match VectorIndex::load(&path, "test-model").unwrap() {
        LoadOutcome::Loaded(loaded) => loaded,
        other => panic!("expected a loaded index, got {:?}", other),
    };

    let probe = normalize(&[0.4, 0.9, 0.2]);
    let before = index.search(&probe, 3).unwrap();
    let after = loaded.search(&probe, 3).unwrap();

    let ids = |results: &[(Chunk, f32)]| -> Vec<String> {
        results.iter().map(|(chunk, _)| chunk.id.clone()).collect()
    };
    assert_eq!(ids(&before), ids(&after));
    for ((_, a), (_, b)) in before.iter().zip(&after) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_load_with_other_model_is_incompatible() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("index.sqlite");
    build(vec![(create_test_chunk("a", "A"), vec![1.0, 0.0])])
        .persist(&path)
        .unwrap();

    match VectorIndex::load(&path, "other-model").unwrap() {
        LoadOutcome::Incompatible { stored, requested } => {
            assert_eq!(stored, "test-model");
            assert_eq!(requested, "other-model");
        }
        other => panic!("expected incompatible, got {:?}", other),
    }
}
