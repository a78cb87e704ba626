//! Tests for the HNSW graph.

use super::*;
use crate::similarity::DistanceMetric;

fn axis_index() -> HnswIndex {
    let mut index = HnswIndex::new(4, DistanceMetric::Cosine);
    index.add(1, &[1.0, 0.0, 0.0, 0.0]).unwrap();
    index.add(2, &[0.0, 1.0, 0.0, 0.0]).unwrap();
    index.add(3, &[0.0, 0.0, 1.0, 0.0]).unwrap();
    index.add(4, &[0.9, 0.1, 0.0, 0.0]).unwrap();
    index
}

#[test]
fn test_empty_index_searches_empty() {
    let index = HnswIndex::new(4, DistanceMetric::Cosine);
    assert!(index.is_empty());
    assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 3, 10).unwrap().is_empty());
}

#[test]
fn test_first_node_becomes_entry_point() {
    let mut index = HnswIndex::new(2, DistanceMetric::Cosine);
    index.add(7, &[1.0, 0.0]).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.entry_point(), Some(0));
}

#[test]
fn test_search_ranks_exact_match_first() {
    let index = axis_index();
    let results = index.search(&[1.0, 0.0, 0.0, 0.0], 3, 10).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, 1);
    assert!((results[0].1 - 1.0).abs() < 1e-6);
    assert_eq!(results[1].0, 4);
    assert!((results[1].1 - 0.9939).abs() < 1e-3);
}

#[test]
fn test_search_results_sorted_descending() {
    let index = axis_index();
    let results = index.search(&[0.5, 0.5, 0.0, 0.0], 4, 10).unwrap();

    for pair in results.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }
}

#[test]
fn test_search_ties_resolve_by_ascending_id() {
    let mut index = HnswIndex::new(2, DistanceMetric::Cosine);
    // Two identical vectors score identically; the smaller id must come first.
    index.add(9, &[1.0, 0.0]).unwrap();
    index.add(3, &[1.0, 0.0]).unwrap();
    index.add(5, &[0.0, 1.0]).unwrap();

    let results = index.search(&[1.0, 0.0], 2, 10).unwrap();
    assert_eq!(results[0].0, 3);
    assert_eq!(results[1].0, 9);
}

#[test]
fn test_search_truncates_to_k() {
    let index = axis_index();
    let results = index.search(&[1.0, 0.0, 0.0, 0.0], 2, 10).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_dimension_mismatch_rejected() {
    let mut index = HnswIndex::new(4, DistanceMetric::Cosine);
    assert_eq!(index.add(1, &[1.0, 0.0]).unwrap_err().code(), -6);
    assert_eq!(index.search(&[1.0], 1, 10).unwrap_err().code(), -6);
}

#[test]
fn test_remove_compacts_and_renumbers() {
    let mut index = axis_index();
    index.remove(1).unwrap();

    assert_eq!(index.len(), 3);
    let results = index.search(&[1.0, 0.0, 0.0, 0.0], 3, 10).unwrap();
    assert!(results.iter().all(|&(id, _)| id != 1));
    assert_eq!(results[0].0, 4);

    // Every surviving edge must point at a live node of sufficient level.
    for (i, node) in index.nodes().iter().enumerate() {
        for (level, conns) in node.connections.iter().enumerate() {
            for &t in conns {
                assert!((t as usize) < index.len());
                assert_ne!(t as usize, i);
                assert!(index.nodes()[t as usize].level >= level);
            }
        }
    }
}

#[test]
fn test_remove_missing_id_fails() {
    let mut index = axis_index();
    assert_eq!(index.remove(99).unwrap_err().code(), -5);
}

#[test]
fn test_remove_entry_point_re_elects_highest_level() {
    let mut index = HnswIndex::new(2, DistanceMetric::Cosine);
    for id in 1..=40u64 {
        #[allow(clippy::cast_precision_loss)]
        index.add(id, &[id as f32, 1.0]).unwrap();
    }

    let ep = index.entry_point().unwrap();
    let ep_id = index.nodes()[ep as usize].id;
    index.remove(ep_id).unwrap();

    let new_ep = index.entry_point().unwrap();
    let expected_level = index.nodes().iter().map(|n| n.level).max().unwrap();
    assert_eq!(index.nodes()[new_ep as usize].level, expected_level);
    assert_eq!(index.max_level(), expected_level);
}

#[test]
fn test_remove_last_node_clears_entry_point() {
    let mut index = HnswIndex::new(2, DistanceMetric::Cosine);
    index.add(1, &[1.0, 0.0]).unwrap();
    index.remove(1).unwrap();

    assert!(index.is_empty());
    assert_eq!(index.entry_point(), None);
    assert!(index.search(&[1.0, 0.0], 1, 10).unwrap().is_empty());
}

#[test]
fn test_corrupted_index_refuses_mutations_until_repair() {
    let mut index = axis_index();
    index.mark_corrupted();

    assert_eq!(index.add(10, &[0.1, 0.2, 0.3, 0.4]).unwrap_err().code(), -7);
    assert_eq!(index.remove(1).unwrap_err().code(), -7);

    index.repair();
    assert!(!index.is_corrupted());
    index.add(10, &[0.1, 0.2, 0.3, 0.4]).unwrap();
}

#[test]
fn test_repair_drops_invalid_edges_and_re_elects() {
    let mut index = axis_index();
    // Corrupt an adjacency list by hand.
    index.nodes[0].connections[0].push(900);
    index.mark_corrupted();

    index.repair();

    for node in index.nodes() {
        for conns in &node.connections {
            for &t in conns {
                assert!((t as usize) < index.len());
            }
        }
    }
    let ep = index.entry_point().unwrap();
    assert_eq!(index.nodes()[ep as usize].level, index.max_level());
}

#[test]
fn test_levels_capped() {
    let mut index = HnswIndex::new(1, DistanceMetric::DotProduct);
    for id in 1..=200u64 {
        #[allow(clippy::cast_precision_loss)]
        index.add(id, &[id as f32]).unwrap();
    }
    assert!(index.nodes().iter().all(|n| n.level <= MAX_LEVEL));
    assert!(index.max_level() <= MAX_LEVEL);
}

#[test]
fn test_level_zero_connection_cap_is_double_m() {
    let params = HnswParams {
        m: 4,
        ..HnswParams::default()
    };
    let mut index = HnswIndex::with_params(2, DistanceMetric::Cosine, params);
    for id in 1..=60u64 {
        #[allow(clippy::cast_precision_loss)]
        let angle = (id as f32) * 0.1;
        index.add(id, &[angle.cos(), angle.sin()]).unwrap();
    }

    for node in index.nodes() {
        for (level, conns) in node.connections.iter().enumerate() {
            let cap = if level == 0 { 8 } else { 4 };
            assert!(conns.len() <= cap, "level {level} holds {}", conns.len());
        }
    }
}

#[test]
fn test_stats_track_counters() {
    let index = axis_index();
    let before = index.stats();
    assert_eq!(before.node_count, 4);

    index.search(&[1.0, 0.0, 0.0, 0.0], 2, 10).unwrap();
    let after = index.stats();
    assert_eq!(after.search_count, before.search_count + 1);
    assert!(after.distance_computations > before.distance_computations);
    assert!(after.memory_bytes > 0);
}

#[test]
fn test_euclidean_metric_ranks_by_distance() {
    let mut index = HnswIndex::new(2, DistanceMetric::Euclidean);
    index.add(1, &[0.0, 0.0]).unwrap();
    index.add(2, &[1.0, 0.0]).unwrap();
    index.add(3, &[5.0, 5.0]).unwrap();

    let results = index.search(&[0.1, 0.0], 3, 10).unwrap();
    assert_eq!(results[0].0, 1);
    assert_eq!(results[1].0, 2);
    assert_eq!(results[2].0, 3);
    // Scores are negated distances.
    assert!(results[0].1 <= 0.0);
}
