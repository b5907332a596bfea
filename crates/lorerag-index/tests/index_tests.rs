use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use lorerag_core::config::DistanceMetric;
use lorerag_core::types::LoreChunk;
use lorerag_index::LoreIndex;

fn chunk(seq: usize, text: &str) -> LoreChunk {
    LoreChunk {
        id: LoreChunk::id_for(seq),
        text: text.to_string(),
        source_document: "lore.txt".to_string(),
    }
}

/// Entries on the x axis at 0, 1, 2, ... so the distance order is obvious.
fn line_index(n: usize) -> LoreIndex {
    let index = LoreIndex::new(DistanceMetric::L2);
    let chunks = (0..n).map(|i| chunk(i, &format!("point {i}"))).collect();
    let vectors = (0..n).map(|i| vec![i as f32, 0.0]).collect();
    index.rebuild(chunks, vectors).unwrap();
    index
}

#[test]
fn empty_index_returns_nothing() {
    let index = LoreIndex::default();
    assert!(index.is_empty());
    assert!(index.retrieve(&[1.0, 2.0], 3).unwrap().is_empty());
}

#[test]
fn returns_min_of_top_k_and_size_sorted_without_duplicates() {
    let index = line_index(5);
    for top_k in [0, 1, 3, 5, 9] {
        let hits = index.retrieve(&[2.2, 0.0], top_k).unwrap();
        assert_eq!(hits.len(), top_k.min(5));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        let ids: HashSet<_> = hits.iter().map(|h| h.id.clone()).collect();
        assert_eq!(ids.len(), hits.len());
    }
    let hits = index.retrieve(&[2.2, 0.0], 3).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["chunk_2", "chunk_3", "chunk_1"]);
    assert_eq!(hits[0].text, "point 2");
}

#[test]
fn ties_break_by_insertion_order() {
    let index = LoreIndex::new(DistanceMetric::L2);
    let chunks = vec![chunk(0, "west"), chunk(1, "east"), chunk(2, "far"), chunk(3, "also west")];
    let vectors = vec![vec![-1.0, 0.0], vec![1.0, 0.0], vec![10.0, 0.0], vec![-1.0, 0.0]];
    index.rebuild(chunks, vectors).unwrap();
    let ids: Vec<String> = index
        .retrieve(&[0.0, 0.0], 3)
        .unwrap()
        .into_iter()
        .map(|h| h.id)
        .collect();
    assert_eq!(ids, ["chunk_0", "chunk_1", "chunk_3"]);
}

#[test]
fn cosine_metric_ignores_magnitude() {
    let index = LoreIndex::new(DistanceMetric::Cosine);
    let chunks = vec![chunk(0, "long"), chunk(1, "aligned")];
    let vectors = vec![vec![0.0, 10.0], vec![5.0, 0.1]];
    index.rebuild(chunks, vectors).unwrap();
    let hits = index.retrieve(&[1.0, 0.0], 1).unwrap();
    assert_eq!(hits[0].id, "chunk_1");
}

#[test]
fn mismatched_rebuild_keeps_previous_index() {
    let index = line_index(3);
    let before = index.retrieve(&[0.0, 0.0], 3).unwrap();

    let err = index
        .rebuild(
            vec![chunk(0, "only chunk")],
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
        )
        .unwrap_err();
    assert!(err.is_validation(), "{err}");

    assert_eq!(index.retrieve(&[0.0, 0.0], 3).unwrap(), before);
    assert_eq!(index.generation(), 1);
}

#[test]
fn mixed_dimensions_are_rejected() {
    let index = line_index(2);
    let err = index
        .rebuild(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![0.0, 1.0], vec![0.0]],
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(index.len(), 2);
}

#[test]
fn duplicate_ids_are_rejected() {
    let index = LoreIndex::default();
    let err = index
        .rebuild(
            vec![chunk(0, "a"), chunk(0, "b")],
            vec![vec![0.0], vec![1.0]],
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert!(index.is_empty());
}

#[test]
fn query_dimension_must_match() {
    let index = line_index(2);
    let err = index.retrieve(&[0.0, 0.0, 0.0], 1).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn non_finite_query_is_rejected() {
    let index = line_index(3);
    for query in [[f32::NAN, 0.0], [0.0, f32::INFINITY]] {
        let err = index.retrieve(&query, 2).unwrap_err();
        assert!(err.is_validation(), "{err}");
    }
}

#[test]
fn overflowing_distances_still_order_by_insertion() {
    let index = line_index(4);
    let hits = index.retrieve(&[3.0e38, 0.0], 3).unwrap();
    assert!(hits.iter().all(|h| h.distance.is_infinite()));
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["chunk_0", "chunk_1", "chunk_2"]);
}

#[test]
fn rebuild_is_idempotent_and_last_build_wins() {
    let index = line_index(4);
    index
        .rebuild(vec![chunk(0, "fresh")], vec![vec![7.0, 7.0]])
        .unwrap();
    index
        .rebuild(vec![chunk(0, "fresher")], vec![vec![7.0, 7.0]])
        .unwrap();
    let hits = index.retrieve(&[0.0, 0.0], 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "fresher");
    let stats = index.stats();
    assert_eq!((stats.len, stats.dim, stats.generation), (1, Some(2), 3));
}

#[test]
fn rebuild_to_empty_clears_the_index() {
    let index = line_index(3);
    index.rebuild(Vec::new(), Vec::new()).unwrap();
    assert!(index.retrieve(&[0.0, 0.0], 3).unwrap().is_empty());
    assert_eq!(index.dim(), None);
}

#[test]
fn readers_never_see_a_mixed_generation() {
    const SIZE: usize = 64;
    let index = Arc::new(LoreIndex::new(DistanceMetric::L2));
    let build = |generation: usize| {
        let chunks = (0..SIZE)
            .map(|i| chunk(i, &format!("gen{generation}")))
            .collect();
        let vectors = (0..SIZE)
            .map(|i| vec![i as f32, generation as f32])
            .collect();
        (chunks, vectors)
    };
    let (c, v) = build(0);
    index.rebuild(c, v).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let hits = index.retrieve(&[0.0, 0.0], SIZE).unwrap();
                    assert_eq!(hits.len(), SIZE);
                    let generations: HashSet<&str> = hits.iter().map(|h| h.text.as_str()).collect();
                    assert_eq!(generations.len(), 1, "mixed generations: {generations:?}");
                }
            })
        })
        .collect();

    for generation in 1..50 {
        let (c, v) = build(generation);
        index.rebuild(c, v).unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(index.generation(), 50);
}
