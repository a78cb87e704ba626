//! Durable storage: the append-only vector log and its in-memory key index.

pub mod key_index;
pub mod log;
pub mod vector_bytes;

#[cfg(test)]
mod key_index_tests;

pub use key_index::{KeyEntry, KeyIndex};
pub use log::{FileHeader, RecordHeader, VectorLog};
