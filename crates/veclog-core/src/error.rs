//! Error types for `VeclogDB`.
//!
//! A single unified error type covers every engine operation. Each variant
//! carries a stable numeric code so host bindings can surface errors as
//! integers without parsing strings.

use thiserror::Error;

/// Result type alias for `VeclogDB` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `VeclogDB` operations.
///
/// Codes mirror the on-the-wire taxonomy: success is the absence of an error
/// (0); every variant maps to a negative code via [`Error::code`].
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid arguments (-1).
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Out of memory or a fixed capacity was exhausted (-2).
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// File I/O error (-3).
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store already exists at the target path (-3).
    #[error("Store already exists at '{0}'")]
    AlreadyExists(String),

    /// Store not found or not open (-4).
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Vector not found (-5).
    #[error("Vector with ID {0} not found")]
    VectorNotFound(u64),

    /// Vector dimension mismatch (-6).
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Store file or index corrupted (-7).
    #[error("Store corrupt: {0}")]
    Corrupt(String),
}

impl Error {
    /// Returns the stable integer code for this error.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidArgs(_) => -1,
            Self::OutOfMemory(_) => -2,
            Self::Io(_) | Self::AlreadyExists(_) => -3,
            Self::StoreNotFound(_) => -4,
            Self::VectorNotFound(_) => -5,
            Self::DimensionMismatch { .. } => -6,
            Self::Corrupt(_) => -7,
        }
    }

    /// Returns true if this error leaves the store usable.
    ///
    /// Corruption is the only state that refuses further writes.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Corrupt(_))
    }
}
