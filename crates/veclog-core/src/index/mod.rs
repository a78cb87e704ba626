//! Approximate nearest-neighbor index.

pub mod hnsw;

pub use hnsw::{HnswIndex, HnswNode, HnswParams, HnswStats};
