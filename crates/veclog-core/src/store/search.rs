//! Top-k similarity search for [`Store`].

use super::{Store, StoreInner};
use crate::error::{Error, Result};
use crate::vector::{SearchQuery, SearchResult};
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// Upper bound on `top_k` per query.
pub const MAX_TOP_K: usize = 10_000;

impl Store {
    /// Finds the `top_k` most similar vectors to the query.
    ///
    /// The HNSW index answers first with beam width `2k`. A full scan of the
    /// log takes over when the index errors, comes back empty on a non-empty
    /// store, or the query asks for a metric other than the one the index
    /// was built under. Search always has a correct O(N) path.
    ///
    /// Results are sorted descending by score, ties by ascending id, and
    /// filtered by `min_similarity` unless it is `0.0`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` for an empty query vector, `top_k` of 0 or more
    /// than [`MAX_TOP_K`], or a `min_similarity` outside `[-1, 1]`;
    /// `DimensionMismatch` for a wrong-sized query; `StoreNotFound` on a
    /// closed store.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        if query.vector.is_empty() {
            return Err(Error::InvalidArgs("query vector is empty".to_string()));
        }
        if query.vector.len() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: query.vector.len(),
            });
        }
        if query.top_k == 0 || query.top_k > MAX_TOP_K {
            return Err(Error::InvalidArgs(format!(
                "top_k {} is out of range [1, {MAX_TOP_K}]",
                query.top_k
            )));
        }
        if !(-1.0..=1.0).contains(&query.min_similarity) {
            return Err(Error::InvalidArgs(format!(
                "min_similarity {} is out of range [-1, 1]",
                query.min_similarity
            )));
        }

        let inner = self.inner.read();
        inner.log()?;

        if inner.live_count == 0 {
            return Ok(Vec::new());
        }

        self.search_count.fetch_add(1, Ordering::Relaxed);

        // The graph ranks under its build metric only; any other metric goes
        // straight to the scan.
        if query.metric == self.config.metric {
            match inner.hnsw.search(&query.vector, query.top_k, query.top_k * 2) {
                Ok(hits) if !hits.is_empty() => {
                    return Ok(hits
                        .into_iter()
                        .filter(|&(_, score)| passes_filter(score, query.min_similarity))
                        .map(|(id, score)| SearchResult::new(id, score))
                        .collect());
                }
                Ok(_) => {
                    debug!("hnsw returned nothing on a non-empty store; falling back to full scan");
                }
                Err(e) => {
                    warn!(error = %e, "hnsw search failed; falling back to full scan");
                }
            }
        }

        Self::scan_search(&inner, query)
    }

    /// Brute-force fallback: score every live record under the query metric.
    fn scan_search(inner: &StoreInner, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let log = inner.log()?;

        let mut results = Vec::new();
        for entry in inner.key_index.iter_live() {
            let (header, data) = match log.read_record(entry.offset) {
                Ok(record) => record,
                Err(e) => {
                    warn!(id = entry.id, error = %e, "skipping unreadable record during scan");
                    continue;
                }
            };
            if header.tombstoned {
                continue;
            }

            let score = query.metric.score(&query.vector, &data);
            if passes_filter(score, query.min_similarity) {
                results.push(SearchResult::new(header.id, score));
            }
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(query.top_k);
        Ok(results)
    }
}

/// `min_similarity` of exactly 0.0 disables the filter.
fn passes_filter(score: f32, min_similarity: f32) -> bool {
    min_similarity == 0.0 || score >= min_similarity
}
