//! Vector value and query types.

use crate::similarity::DistanceMetric;
use serde::{Deserialize, Serialize};

/// A stored vector: a 64-bit key, its embedding, and a creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// Unique identifier.
    pub id: u64,

    /// The embedding data.
    pub data: Vec<f32>,

    /// Creation or update time, unix seconds.
    pub timestamp: u64,
}

impl Vector {
    /// Creates a vector stamped with the current time.
    #[must_use]
    pub fn new(id: u64, data: Vec<f32>) -> Self {
        Self {
            id,
            data,
            timestamp: crate::util::unix_timestamp(),
        }
    }

    /// Returns the dimension of the embedding.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.data.len()
    }
}

/// A top-k similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The query embedding.
    pub vector: Vec<f32>,

    /// Number of results requested.
    pub top_k: usize,

    /// Metric to rank under.
    pub metric: DistanceMetric,

    /// Minimum score to include; `0.0` disables the filter.
    pub min_similarity: f32,
}

impl SearchQuery {
    /// Creates a query with the filter disabled.
    #[must_use]
    pub fn new(vector: Vec<f32>, top_k: usize, metric: DistanceMetric) -> Self {
        Self {
            vector,
            top_k,
            metric,
            min_similarity: 0.0,
        }
    }

    /// Sets the minimum-score filter.
    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the matching vector.
    pub id: u64,

    /// Metric-adjusted score; higher is better.
    pub score: f32,
}

impl SearchResult {
    /// Creates a search result.
    #[must_use]
    pub const fn new(id: u64, score: f32) -> Self {
        Self { id, score }
    }
}
