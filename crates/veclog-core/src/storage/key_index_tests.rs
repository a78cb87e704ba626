//! Tests for the key index.

use super::key_index::*;

fn entry(id: u64, offset: u64) -> KeyEntry {
    KeyEntry {
        id,
        offset,
        dimension: 4,
        timestamp: 1_700_000_000,
        tombstoned: false,
    }
}

#[test]
fn test_insert_and_find() {
    let mut index = KeyIndex::new();
    index.insert(entry(42, 64));

    let found = index.find(42).unwrap();
    assert_eq!(found.offset, 64);
    assert!(index.find(43).is_none());
}

#[test]
fn test_colliding_ids_chain_in_one_bucket() {
    let mut index = KeyIndex::new();
    let a = 5u64;
    let b = a + TABLE_SIZE as u64;
    let c = a + 2 * TABLE_SIZE as u64;
    index.insert(entry(a, 100));
    index.insert(entry(b, 200));
    index.insert(entry(c, 300));

    assert_eq!(index.find(a).unwrap().offset, 100);
    assert_eq!(index.find(b).unwrap().offset, 200);
    assert_eq!(index.find(c).unwrap().offset, 300);
}

#[test]
fn test_tombstone_hides_entry() {
    let mut index = KeyIndex::new();
    index.insert(entry(7, 64));

    assert_eq!(index.tombstone(7), Some(64));
    assert!(index.find(7).is_none());

    // Tombstoning twice finds nothing live.
    assert_eq!(index.tombstone(7), None);
}

#[test]
fn test_reinsert_after_tombstone_shadows_dead_entry() {
    let mut index = KeyIndex::new();
    index.insert(entry(7, 64));
    index.tombstone(7);
    index.insert(entry(7, 512));

    let found = index.find(7).unwrap();
    assert_eq!(found.offset, 512);
    assert!(!found.tombstoned);
}

#[test]
fn test_iter_live_skips_tombstones() {
    let mut index = KeyIndex::new();
    index.insert(entry(1, 64));
    index.insert(entry(2, 128));
    index.insert(entry(3, 192));
    index.tombstone(2);

    let mut live: Vec<u64> = index.iter_live().map(|e| e.id).collect();
    live.sort_unstable();
    assert_eq!(live, vec![1, 3]);
    assert_eq!(index.live_len(), 2);
}

#[test]
fn test_clear_empties_every_bucket() {
    let mut index = KeyIndex::new();
    for id in 1..=100 {
        index.insert(entry(id, id * 64));
    }
    index.clear();
    assert_eq!(index.live_len(), 0);
    assert!(index.find(50).is_none());
}
