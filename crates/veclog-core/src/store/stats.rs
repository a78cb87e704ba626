//! Store statistics.

use super::Store;
use crate::error::Result;
use crate::index::HnswStats;
use crate::similarity::DistanceMetric;
use serde::Serialize;
use std::sync::atomic::Ordering;

/// A point-in-time report on a store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Vectors currently live.
    pub live_count: u64,
    /// On-disk size of the log file in bytes.
    pub size_bytes: u64,
    /// Declared vector dimension.
    pub dimension: usize,
    /// Declared default metric.
    pub metric: DistanceMetric,
    /// Path of the log file.
    pub path: String,
    /// Inserts since the store was opened.
    pub insert_count: u64,
    /// Searches since the store was opened.
    pub search_count: u64,
    /// Deletes since the store was opened.
    pub delete_count: u64,
    /// ANN index statistics.
    pub hnsw: HnswStats,
}

impl Store {
    /// Reports current statistics.
    ///
    /// Works even while the HNSW integrity flag is set; only a closed store
    /// refuses.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotFound` on a closed store; I/O errors pass through.
    pub fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.read();
        let log = inner.log()?;

        Ok(StoreStats {
            live_count: inner.live_count,
            size_bytes: log.size()?,
            dimension: self.config.dimension,
            metric: self.config.metric,
            path: log.path().display().to_string(),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            search_count: self.search_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            hnsw: inner.hnsw.stats(),
        })
    }
}
