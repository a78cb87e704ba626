//! CRUD operations for [`Store`].

use super::{Store, StoreInner};
use crate::error::{Error, Result};
use crate::storage::KeyEntry;
use crate::util::unix_timestamp;
use crate::vector::Vector;
use std::sync::atomic::Ordering;
use tracing::warn;

impl Store {
    /// Inserts a vector under its id.
    ///
    /// The record is appended and flushed before the indexes are touched. A
    /// failed HNSW insertion does not roll the record back: the vector is
    /// present, the ANN index is flagged stale, and a reopen rebuilds it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` for empty data or a duplicate id,
    /// `DimensionMismatch` for a wrong-sized vector, `OutOfMemory` when the
    /// configured vector bound is reached, and `StoreNotFound` on a closed
    /// store.
    pub fn insert(&self, vector: &Vector) -> Result<()> {
        let _write = self.write_latch.lock();
        let mut inner = self.inner.write();
        self.insert_locked(&mut inner, vector)
    }

    /// Inserts a batch of vectors under a single latch acquisition.
    ///
    /// Dimensions are validated up front. The first failing insert aborts
    /// the batch; vectors already appended stay in the store, exactly as if
    /// they had been inserted individually. Returns the number inserted.
    ///
    /// # Errors
    ///
    /// As [`Store::insert`].
    pub fn insert_batch(&self, vectors: &[Vector]) -> Result<usize> {
        for vector in vectors {
            if vector.data.is_empty() {
                return Err(Error::InvalidArgs(format!(
                    "vector {} has no data",
                    vector.id
                )));
            }
            if vector.dimension() != self.config.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: vector.dimension(),
                });
            }
        }

        let _write = self.write_latch.lock();
        let mut inner = self.inner.write();

        let mut inserted = 0usize;
        for vector in vectors {
            self.insert_locked(&mut inner, vector)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Replaces the vector stored under an id.
    ///
    /// The old record is tombstoned and a fresh one appended; tombstones are
    /// never cleared in place.
    ///
    /// # Errors
    ///
    /// Returns `VectorNotFound` when the id is absent; otherwise as
    /// [`Store::insert`].
    pub fn update(&self, vector: &Vector) -> Result<()> {
        if vector.data.is_empty() {
            return Err(Error::InvalidArgs("vector data is empty".to_string()));
        }
        if vector.dimension() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.dimension(),
            });
        }

        let _write = self.write_latch.lock();
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let log = inner
            .log
            .as_ref()
            .ok_or_else(|| Error::StoreNotFound("store is closed".to_string()))?;

        let old_offset = inner
            .key_index
            .tombstone(vector.id)
            .ok_or(Error::VectorNotFound(vector.id))?;
        log.set_tombstone(old_offset)?;

        if let Err(e) = inner.hnsw.remove(vector.id) {
            warn!(id = vector.id, error = %e, "hnsw removal failed during update");
        }

        let timestamp = unix_timestamp();
        let offset = log.append(vector.id, timestamp, &vector.data)?;
        inner.key_index.insert(KeyEntry {
            id: vector.id,
            offset,
            dimension: u32::try_from(vector.dimension()).expect("dimension bounded by config"),
            timestamp,
            tombstoned: false,
        });

        if let Err(e) = inner.hnsw.add(vector.id, &vector.data) {
            warn!(id = vector.id, error = %e, "hnsw add failed during update; ann index marked stale");
            inner.hnsw.mark_corrupted();
        }

        self.insert_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Retrieves the vector stored under `id`.
    ///
    /// The returned value is freshly read from disk; the on-disk tombstone
    /// is honored even when a deleter races this call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` for id 0, `VectorNotFound` for an absent or
    /// tombstoned id, and `StoreNotFound` on a closed store.
    pub fn get(&self, id: u64) -> Result<Vector> {
        if id == 0 {
            return Err(Error::InvalidArgs("vector id 0 is reserved".to_string()));
        }

        let inner = self.inner.read();
        let log = inner.log()?;

        let entry = inner.key_index.find(id).ok_or(Error::VectorNotFound(id))?;
        let (header, data) = log.read_record(entry.offset)?;
        if header.tombstoned {
            return Err(Error::VectorNotFound(id));
        }

        Ok(Vector {
            id: header.id,
            data,
            timestamp: header.timestamp,
        })
    }

    /// Deletes the vector stored under `id`.
    ///
    /// The in-memory entry and the on-disk byte are tombstoned, then the
    /// node leaves the HNSW graph; a failed graph removal is logged, not
    /// surfaced.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` for id 0, `VectorNotFound` for an absent id,
    /// and `StoreNotFound` on a closed store.
    pub fn delete(&self, id: u64) -> Result<()> {
        if id == 0 {
            return Err(Error::InvalidArgs("vector id 0 is reserved".to_string()));
        }

        let _write = self.write_latch.lock();
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let log = inner
            .log
            .as_ref()
            .ok_or_else(|| Error::StoreNotFound("store is closed".to_string()))?;

        let offset = inner
            .key_index
            .tombstone(id)
            .ok_or(Error::VectorNotFound(id))?;
        log.set_tombstone(offset)?;

        if let Err(e) = inner.hnsw.remove(id) {
            warn!(id, error = %e, "hnsw removal failed; ann index may be stale");
        }

        inner.live_count = inner.live_count.saturating_sub(1);
        self.delete_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Insert body shared by [`Store::insert`] and [`Store::insert_batch`];
    /// both latches are already held.
    fn insert_locked(&self, inner: &mut StoreInner, vector: &Vector) -> Result<()> {
        if vector.data.is_empty() {
            return Err(Error::InvalidArgs("vector data is empty".to_string()));
        }
        if vector.dimension() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.dimension(),
            });
        }

        let log = inner
            .log
            .as_ref()
            .ok_or_else(|| Error::StoreNotFound("store is closed".to_string()))?;

        if let Some(max) = self.config.max_vectors {
            if inner.live_count >= max as u64 {
                return Err(Error::OutOfMemory(format!(
                    "store holds its configured maximum of {max} vectors"
                )));
            }
        }

        if inner.key_index.find(vector.id).is_some() {
            return Err(Error::InvalidArgs(format!(
                "vector {} already exists",
                vector.id
            )));
        }

        let timestamp = unix_timestamp();
        let offset = log.append(vector.id, timestamp, &vector.data)?;
        inner.key_index.insert(KeyEntry {
            id: vector.id,
            offset,
            dimension: u32::try_from(vector.dimension()).expect("dimension bounded by config"),
            timestamp,
            tombstoned: false,
        });

        if let Err(e) = inner.hnsw.add(vector.id, &vector.data) {
            warn!(id = vector.id, error = %e, "hnsw add failed; ann index marked stale");
            inner.hnsw.mark_corrupted();
        }

        inner.live_count += 1;
        if vector.id >= inner.next_id {
            inner.next_id = vector.id + 1;
        }
        self.insert_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
