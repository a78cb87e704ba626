//! In-memory key index over the vector log.
//!
//! A fixed-size separate-chaining hash table mapping a vector id to the file
//! offset of its record. The table never rehashes; the prime size keeps
//! chains short up to the documented store bounds. Tombstoning an entry is
//! monotone: a re-inserted id gets a fresh entry and lookups skip the dead
//! one.

/// Number of buckets. Prime, for even distribution of sequential ids.
pub const TABLE_SIZE: usize = 10_007;

/// One key-index entry: where a record lives and what its header said.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    /// Vector id.
    pub id: u64,
    /// Byte offset of the record header in the log file.
    pub offset: u64,
    /// Dimension recorded in the record header.
    pub dimension: u32,
    /// Timestamp recorded in the record header.
    pub timestamp: u64,
    /// True once the record is logically deleted.
    pub tombstoned: bool,
}

/// Fixed-size chained hash map from id to [`KeyEntry`].
#[derive(Debug)]
pub struct KeyIndex {
    buckets: Vec<Vec<KeyEntry>>,
}

impl KeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: (0..TABLE_SIZE).map(|_| Vec::new()).collect(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bucket_of(id: u64) -> usize {
        (id % TABLE_SIZE as u64) as usize
    }

    /// Installs an entry. A fresh entry shadows any tombstoned one with the
    /// same id.
    pub fn insert(&mut self, entry: KeyEntry) {
        self.buckets[Self::bucket_of(entry.id)].push(entry);
    }

    /// Finds the live entry for `id`, skipping tombstones.
    #[must_use]
    pub fn find(&self, id: u64) -> Option<&KeyEntry> {
        self.buckets[Self::bucket_of(id)]
            .iter()
            .rev()
            .find(|e| e.id == id && !e.tombstoned)
    }

    /// Tombstones the live entry for `id`, returning its file offset.
    pub fn tombstone(&mut self, id: u64) -> Option<u64> {
        self.buckets[Self::bucket_of(id)]
            .iter_mut()
            .rev()
            .find(|e| e.id == id && !e.tombstoned)
            .map(|e| {
                e.tombstoned = true;
                e.offset
            })
    }

    /// Iterates every live entry in bucket order.
    pub fn iter_live(&self) -> impl Iterator<Item = &KeyEntry> {
        self.buckets.iter().flatten().filter(|e| !e.tombstoned)
    }

    /// Counts live entries. O(n); the store tracks its own live count.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.iter_live().count()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self::new()
    }
}
