//! Tests for store lifecycle: create, open, close, destroy.

use crate::config::StoreConfig;
use crate::similarity::DistanceMetric;
use crate::store::Store;
use crate::vector::{SearchQuery, Vector};
use tempfile::tempdir;

#[test]
fn test_create_rejects_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dup.vlog");
    let config = StoreConfig::new("dup", &path, 4, DistanceMetric::Cosine);
    let store = Store::create(config.clone()).unwrap();
    store.close().unwrap();

    let err = Store::create(config).unwrap_err();
    assert_eq!(err.code(), -3);
}

#[test]
fn test_create_rejects_invalid_dimension() {
    let dir = tempdir().unwrap();
    for dimension in [0usize, 4097] {
        let path = dir.path().join(format!("bad{dimension}.vlog"));
        let config = StoreConfig::new("bad", &path, dimension, DistanceMetric::Cosine);
        assert_eq!(Store::create(config).unwrap_err().code(), -1);
    }
}

#[test]
fn test_boundary_dimensions_work() {
    let dir = tempdir().unwrap();

    let one = Store::create(StoreConfig::new(
        "one",
        dir.path().join("one.vlog"),
        1,
        DistanceMetric::Cosine,
    ))
    .unwrap();
    one.insert(&Vector::new(1, vec![2.0])).unwrap();
    assert_eq!(one.get(1).unwrap().data, vec![2.0]);

    let wide = Store::create(StoreConfig::new(
        "wide",
        dir.path().join("wide.vlog"),
        4096,
        DistanceMetric::Cosine,
    ))
    .unwrap();
    wide.insert(&Vector::new(1, vec![0.5; 4096])).unwrap();
    assert_eq!(wide.get(1).unwrap().dimension(), 4096);
}

#[test]
fn test_close_persists_and_reopen_restores() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.vlog");

    let store = Store::create(StoreConfig::new(
        "persist",
        &path,
        4,
        DistanceMetric::Cosine,
    ))
    .unwrap();
    store.insert(&Vector::new(7, vec![1.0, 2.0, 3.0, 4.0])).unwrap();
    store.close().unwrap();
    assert!(!store.is_open());

    let reopened = Store::open(&path).unwrap();
    assert_eq!(reopened.config().dimension, 4);
    assert_eq!(reopened.config().metric, DistanceMetric::Cosine);

    let got = reopened.get(7).unwrap();
    assert_eq!(got.data, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(got.dimension(), 4);
    assert_eq!(reopened.stats().unwrap().live_count, 1);
}

#[test]
fn test_double_close_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("twice.vlog");
    let store =
        Store::create(StoreConfig::new("twice", &path, 2, DistanceMetric::Cosine)).unwrap();

    store.close().unwrap();
    assert_eq!(store.close().unwrap_err().code(), -1);
}

#[test]
fn test_open_missing_store_not_found() {
    let dir = tempdir().unwrap();
    let err = Store::open(dir.path().join("absent.vlog")).unwrap_err();
    assert_eq!(err.code(), -4);
}

#[test]
fn test_open_corrupt_magic_no_partial_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.vlog");
    std::fs::write(&path, vec![0x00u8; 256]).unwrap();

    let err = Store::open(&path).unwrap_err();
    assert_eq!(err.code(), -7);
}

#[test]
fn test_delete_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tombs.vlog");

    let store =
        Store::create(StoreConfig::new("tombs", &path, 2, DistanceMetric::Cosine)).unwrap();
    store.insert(&Vector::new(1, vec![1.0, 0.0])).unwrap();
    store.insert(&Vector::new(2, vec![0.0, 1.0])).unwrap();
    store.delete(1).unwrap();
    store.close().unwrap();

    let reopened = Store::open(&path).unwrap();
    assert_eq!(reopened.stats().unwrap().live_count, 1);
    assert_eq!(reopened.get(1).unwrap_err().code(), -5);
    assert_eq!(reopened.get(2).unwrap().data, vec![0.0, 1.0]);

    // The rebuilt graph must not surface the deleted id either.
    let query = SearchQuery::new(vec![1.0, 0.0], 2, DistanceMetric::Cosine);
    let results = reopened.search(&query).unwrap();
    assert!(results.iter().all(|r| r.id != 1));
    assert_eq!(reopened.stats().unwrap().hnsw.node_count, 1);
}

#[test]
fn test_reinsert_after_delete_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fresh.vlog");

    let store =
        Store::create(StoreConfig::new("fresh", &path, 2, DistanceMetric::Cosine)).unwrap();
    store.insert(&Vector::new(1, vec![1.0, 0.0])).unwrap();
    store.delete(1).unwrap();
    store.insert(&Vector::new(1, vec![1.0, 0.0])).unwrap();
    store.close().unwrap();

    let reopened = Store::open(&path).unwrap();
    assert_eq!(reopened.get(1).unwrap().data, vec![1.0, 0.0]);
    assert_eq!(reopened.stats().unwrap().live_count, 1);
}

#[test]
fn test_next_id_advances_past_live_ids_on_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nid.vlog");

    let store = Store::create(StoreConfig::new("nid", &path, 2, DistanceMetric::Cosine)).unwrap();
    store.insert(&Vector::new(100, vec![1.0, 0.0])).unwrap();
    store.close().unwrap();

    // Reopen and insert again under a conflicting low id; both must coexist.
    let reopened = Store::open(&path).unwrap();
    reopened.insert(&Vector::new(5, vec![0.0, 1.0])).unwrap();
    assert!(reopened.get(100).is_ok());
    assert!(reopened.get(5).is_ok());
}

#[test]
fn test_destroy_unlinks_and_double_destroy_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.vlog");
    let store =
        Store::create(StoreConfig::new("gone", &path, 2, DistanceMetric::Cosine)).unwrap();
    store.close().unwrap();

    Store::destroy(&path).unwrap();
    assert!(!path.exists());
    assert_eq!(Store::destroy(&path).unwrap_err().code(), -3);
}

#[test]
fn test_save_index_writes_diagnostic_artifact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diag.vlog");
    let store =
        Store::create(StoreConfig::new("diag", &path, 2, DistanceMetric::Cosine)).unwrap();
    store.insert(&Vector::new(1, vec![1.0, 0.0])).unwrap();

    let index_path = dir.path().join("diag.hnsw");
    store.save_index(&index_path).unwrap();
    assert!(index_path.exists());

    let loaded = crate::index::HnswIndex::load(&index_path).unwrap();
    assert_eq!(loaded.len(), 1);
}

#[test]
fn test_repair_index_on_healthy_store_is_noop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("repair.vlog");
    let store =
        Store::create(StoreConfig::new("repair", &path, 2, DistanceMetric::Cosine)).unwrap();
    store.insert(&Vector::new(1, vec![1.0, 0.0])).unwrap();

    store.repair_index().unwrap();
    assert_eq!(store.stats().unwrap().hnsw.node_count, 1);
}
