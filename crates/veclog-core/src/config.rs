//! Store configuration.
//!
//! The engine consumes a validated [`StoreConfig`] record; loading one from a
//! file or the environment is the host's job.

use crate::error::{Error, Result};
use crate::similarity::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum supported vector dimension.
pub const MAX_DIMENSION: usize = 4096;

/// Default vector dimension used by hosts that do not specify one.
pub const DEFAULT_DIMENSION: usize = 512;

/// Maximum length of a store name.
pub const MAX_NAME_LEN: usize = 256;

/// Configuration record for a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Human-readable store name.
    pub name: String,
    /// Path of the vector log file.
    pub path: PathBuf,
    /// Vector dimension, in `[1, 4096]`.
    pub dimension: usize,
    /// Default similarity metric.
    pub metric: DistanceMetric,
    /// Optional upper bound on live vectors.
    #[serde(default)]
    pub max_vectors: Option<usize>,
}

impl StoreConfig {
    /// Creates a configuration with no vector bound.
    pub fn new<P: AsRef<Path>>(
        name: &str,
        path: P,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            name: name.to_string(),
            path: path.as_ref().to_path_buf(),
            dimension,
            metric,
            max_vectors: None,
        }
    }

    /// Sets an upper bound on the number of live vectors.
    #[must_use]
    pub fn with_max_vectors(mut self, max_vectors: usize) -> Self {
        self.max_vectors = Some(max_vectors);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgs` on a dimension outside `[1, 4096]`, an empty
    /// path, or an over-long name.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 || self.dimension > MAX_DIMENSION {
            return Err(Error::InvalidArgs(format!(
                "dimension {} is out of range [1, {MAX_DIMENSION}]",
                self.dimension
            )));
        }

        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidArgs("store path is empty".to_string()));
        }

        if self.name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidArgs(format!(
                "store name exceeds {MAX_NAME_LEN} bytes"
            )));
        }

        if let Some(max) = self.max_vectors {
            if max == 0 {
                return Err(Error::InvalidArgs(
                    "max_vectors must be positive when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}
