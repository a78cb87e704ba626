//! Engine façade.
//!
//! [`Store`] owns the vector log, the key index, the HNSW index, and the
//! latches that coordinate them. The log is authoritative; the HNSW index is
//! an accelerator rebuilt from the log on open, and any disagreement between
//! the two resolves in favor of the log.
//!
//! # Latching
//!
//! Two latches per store. The mutation mutex serializes all writers; the
//! read-write lock keeps writers from restructuring the indexes while
//! searches traverse them, while still admitting many concurrent searches.
//! Writers take both (mutex first), searches take shared access only.

mod crud;
mod search;
mod stats;

#[cfg(test)]
mod lifecycle_tests;

pub use search::MAX_TOP_K;
pub use stats::StoreStats;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::index::HnswIndex;
use crate::storage::{KeyEntry, KeyIndex, VectorLog};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::AtomicU64;
use tracing::warn;

/// A single persistent vector store.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    /// Mutation mutex: serializes insert, update, delete, and close.
    write_latch: Mutex<()>,
    /// Search lock: shared for reads, exclusive for index restructuring.
    inner: RwLock<StoreInner>,
    insert_count: AtomicU64,
    search_count: AtomicU64,
    delete_count: AtomicU64,
}

/// Everything the latches guard.
#[derive(Debug)]
struct StoreInner {
    /// `None` once the store is closed.
    log: Option<VectorLog>,
    key_index: KeyIndex,
    hnsw: HnswIndex,
    live_count: u64,
    next_id: u64,
}

impl StoreInner {
    fn log(&self) -> Result<&VectorLog> {
        self.log
            .as_ref()
            .ok_or_else(|| Error::StoreNotFound("store is closed".to_string()))
    }
}

impl Store {
    /// Creates a new store from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` for a bad configuration and `AlreadyExists`
    /// when a file is present at the configured path.
    pub fn create(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let log = VectorLog::create(
            &config.path,
            u32::try_from(config.dimension).expect("dimension bounded by validate"),
            config.metric,
        )?;
        let hnsw = HnswIndex::new(config.dimension, config.metric);

        Ok(Self {
            inner: RwLock::new(StoreInner {
                log: Some(log),
                key_index: KeyIndex::new(),
                hnsw,
                live_count: 0,
                next_id: 1,
            }),
            config,
            write_latch: Mutex::new(()),
            insert_count: AtomicU64::new(0),
            search_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
        })
    }

    /// Opens an existing store, rebuilding the key index and the HNSW index
    /// from the log record by record.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotFound` when no file exists at `path` and `Corrupt`
    /// when the header fails validation.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (log, header) = VectorLog::open(path)?;

        let dimension = header.dimension as usize;
        let metric = header.metric;

        let mut key_index = KeyIndex::new();
        let mut hnsw = HnswIndex::new(dimension, metric);
        let mut live_count = 0u64;
        let mut max_id = 0u64;

        log.scan(|offset, record, payload| {
            max_id = max_id.max(record.id);
            let Some(data) = payload else {
                return;
            };
            key_index.insert(KeyEntry {
                id: record.id,
                offset,
                dimension: record.dimension,
                timestamp: record.timestamp,
                tombstoned: false,
            });
            live_count += 1;
            if let Err(e) = hnsw.add(record.id, &data) {
                warn!(id = record.id, error = %e, "failed to rebuild hnsw entry; index marked stale");
                hnsw.mark_corrupted();
            }
        })?;

        // The header counters may be stale after a crash; the scan wins.
        let next_id = header.next_id.max(max_id + 1);

        let name = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let config = StoreConfig::new(&name, path, dimension, metric);

        Ok(Self {
            inner: RwLock::new(StoreInner {
                log: Some(log),
                key_index,
                hnsw,
                live_count,
                next_id,
            }),
            config,
            write_latch: Mutex::new(()),
            insert_count: AtomicU64::new(0),
            search_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
        })
    }

    /// Closes the store: rewrites the header with final counters, flushes,
    /// and releases the file handle and in-memory indexes.
    ///
    /// # Errors
    ///
    /// A second close returns `InvalidArgs`.
    pub fn close(&self) -> Result<()> {
        let _write = self.write_latch.lock();
        let mut inner = self.inner.write();

        let log = inner
            .log
            .take()
            .ok_or_else(|| Error::InvalidArgs("store already closed".to_string()))?;
        log.rewrite_header(inner.live_count, inner.next_id)?;
        drop(log);

        inner.key_index.clear();
        inner.hnsw = HnswIndex::new(self.config.dimension, self.config.metric);
        Ok(())
    }

    /// Removes the store file at `path`.
    ///
    /// # Errors
    ///
    /// Unlink failures (including a missing file) surface as I/O errors.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        std::fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// Runs the HNSW repair pass: sweeps invalid edges, re-elects the entry
    /// point, and clears the integrity flag.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotFound` on a closed store.
    pub fn repair_index(&self) -> Result<()> {
        let _write = self.write_latch.lock();
        let mut inner = self.inner.write();
        inner.log()?;
        inner.hnsw.repair();
        Ok(())
    }

    /// Saves the HNSW graph to `path` as a diagnostic/backup artifact.
    ///
    /// The engine never loads this on open; it rebuilds from the log.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotFound` on a closed store; I/O errors pass through.
    pub fn save_index<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let inner = self.inner.read();
        inner.log()?;
        inner.hnsw.save(path)
    }

    /// The configuration this store runs under.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns true until [`Store::close`] succeeds.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.read().log.is_some()
    }
}
