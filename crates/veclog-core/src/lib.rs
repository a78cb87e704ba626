//! # `VeclogDB` Core
//!
//! Embeddable vector database engine written in Rust.
//!
//! `VeclogDB` keeps every vector in an append-only on-disk log, accelerates
//! key lookups with an in-memory hash index, and answers top-k similarity
//! queries through an HNSW graph that is rebuilt from the log on every open.
//! The log is the single source of truth; the graph is an accelerator with a
//! brute-force fallback, so searches stay correct even when the index is
//! stale.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use veclog_core::{DistanceMetric, SearchQuery, Store, StoreConfig, Vector};
//!
//! let config = StoreConfig::new("docs", "./docs.vlog", 4, DistanceMetric::Cosine);
//! let store = Store::create(config)?;
//!
//! store.insert(&Vector::new(1, vec![1.0, 0.0, 0.0, 0.0]))?;
//!
//! let query = SearchQuery::new(vec![1.0, 0.0, 0.0, 0.0], 3, DistanceMetric::Cosine);
//! let results = store.search(&query)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod index;
pub mod similarity;
pub mod storage;
pub mod store;
pub mod util;
pub mod vector;


pub use config::StoreConfig;
pub use error::{Error, Result};
pub use index::{HnswIndex, HnswParams, HnswStats};
pub use similarity::DistanceMetric;
pub use store::{Store, StoreStats};
pub use vector::{SearchQuery, SearchResult, Vector};
