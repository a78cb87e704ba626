//! Hierarchical Navigable Small-World index.
//!
//! An in-memory multi-layer proximity graph answering approximate top-k
//! queries in expected logarithmic time. Nodes live in a dense arena and
//! reference each other by arena index, so the graph carries no ownership
//! cycles and serializes trivially.
//!
//! The index performs no locking of its own: the owning engine serializes
//! mutations and shields searches behind its read-write latch. Statistics
//! counters are atomic so they stay readable without any latch.

mod persistence;
pub mod queue;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::similarity::DistanceMetric;
use crate::util::unix_timestamp;
use queue::{BoundedHeap, HeapItem, Orientation};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Hard cap on node levels.
pub const MAX_LEVEL: usize = 15;

/// Tuning parameters for graph construction and search.
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    /// Maximum connections per node above level 0; level 0 allows `2 * m`.
    pub m: usize,
    /// Beam width during construction.
    pub ef_construction: usize,
    /// Default beam width during search.
    pub ef_search: usize,
    /// Level draw multiplier.
    pub level_mult: f64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            level_mult: 1.0 / std::f64::consts::LN_2,
        }
    }
}

/// A graph node: the vector it carries and its adjacency per level.
#[derive(Debug, Clone)]
pub struct HnswNode {
    /// Vector identifier (the store key, not the arena index).
    pub id: u64,
    /// Height of this node; it appears on levels `0..=level`.
    pub level: usize,
    /// The embedding.
    pub vector: Vec<f32>,
    /// Neighbor arena indices, one list per level `0..=level`.
    pub connections: Vec<Vec<u32>>,
}

/// Point-in-time statistics for an index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HnswStats {
    /// Nodes currently in the arena.
    pub node_count: usize,
    /// Highest level in use.
    pub max_level: usize,
    /// Level of the entry point, 0 when empty.
    pub entry_point_level: usize,
    /// Searches answered since construction.
    pub search_count: u64,
    /// Similarity evaluations since construction.
    pub distance_computations: u64,
    /// Mean outgoing edges per node across all levels.
    pub avg_connections_per_node: f32,
    /// Approximate resident size in bytes.
    pub memory_bytes: u64,
}

/// In-memory HNSW index.
#[derive(Debug)]
pub struct HnswIndex {
    nodes: Vec<HnswNode>,
    entry_point: Option<u32>,
    max_level: usize,
    dimension: usize,
    metric: DistanceMetric,
    params: HnswParams,
    rng_state: AtomicU64,
    search_count: AtomicU64,
    distance_computations: AtomicU64,
    corrupted: AtomicBool,
    last_modified: u64,
}

impl HnswIndex {
    /// Creates an empty index with default parameters.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self::with_params(dimension, metric, HnswParams::default())
    }

    /// Creates an empty index with explicit parameters.
    #[must_use]
    pub fn with_params(dimension: usize, metric: DistanceMetric, params: HnswParams) -> Self {
        // Seed the level stream once per index; xorshift needs a nonzero state.
        let seed = unix_timestamp()
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .max(1)
            | 1;
        Self {
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            dimension,
            metric,
            params,
            rng_state: AtomicU64::new(seed),
            search_count: AtomicU64::new(0),
            distance_computations: AtomicU64::new(0),
            corrupted: AtomicBool::new(false),
            last_modified: unix_timestamp(),
        }
    }

    /// Number of nodes in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the index holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dimension the index was built for.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Metric the index ranks under.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Parameters the index was built with.
    #[must_use]
    pub fn params(&self) -> HnswParams {
        self.params
    }

    /// Returns true while the integrity flag is set.
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        self.corrupted.load(Ordering::Acquire)
    }

    /// Sets the integrity flag; mutations refuse until [`HnswIndex::repair`].
    pub fn mark_corrupted(&self) {
        self.corrupted.store(true, Ordering::Release);
    }

    /// Seconds-since-epoch of the last structural change.
    #[must_use]
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// Inserts a vector under `id`.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` while the integrity flag is set and
    /// `DimensionMismatch` for a wrong-sized vector. On error the arena is
    /// unchanged.
    pub fn add(&mut self, id: u64, vector: &[f32]) -> Result<()> {
        if self.is_corrupted() {
            return Err(Error::Corrupt(
                "hnsw integrity flag set; run repair before mutating".to_string(),
            ));
        }
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let level = self.random_level();
        let new_idx = u32::try_from(self.nodes.len())
            .map_err(|_| Error::OutOfMemory("hnsw arena exceeds u32 indices".to_string()))?;
        self.nodes.push(HnswNode {
            id,
            level,
            vector: vector.to_vec(),
            connections: vec![Vec::new(); level + 1],
        });

        let Some(ep) = self.entry_point else {
            self.entry_point = Some(new_idx);
            self.max_level = level;
            self.touch();
            return Ok(());
        };

        let query = self.nodes[new_idx as usize].vector.clone();

        // Greedy descent through the layers above the drawn level.
        let mut current = ep;
        for l in ((level + 1)..=self.max_level).rev() {
            current = self.search_layer_single(&query, current, l);
        }

        // Beam-connect on every layer the new node participates in.
        for l in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(&query, current, self.params.ef_construction, l);
            let max_conn = self.max_connections(l);

            let selected: Vec<u32> = candidates.iter().take(max_conn).map(|c| c.node).collect();
            self.nodes[new_idx as usize].connections[l] = selected.clone();

            // Back-edges only where the neighbor still has room.
            for &nb in &selected {
                let nb_node = &mut self.nodes[nb as usize];
                if nb_node.connections[l].len() < max_conn {
                    nb_node.connections[l].push(new_idx);
                }
            }

            if let Some(best) = candidates.first() {
                current = best.node;
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(new_idx);
        }

        self.touch();
        Ok(())
    }

    /// Removes the node carrying `id`, compacting the arena and renumbering
    /// every edge past it.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` while the integrity flag is set and
    /// `VectorNotFound` when no node carries `id`.
    pub fn remove(&mut self, id: u64) -> Result<()> {
        if self.is_corrupted() {
            return Err(Error::Corrupt(
                "hnsw integrity flag set; run repair before mutating".to_string(),
            ));
        }

        let idx = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(Error::VectorNotFound(id))?;
        let removed = u32::try_from(idx).expect("arena indices fit in u32");

        self.nodes.remove(idx);

        for node in &mut self.nodes {
            for conns in &mut node.connections {
                conns.retain(|&t| t != removed);
                for t in conns.iter_mut() {
                    if *t > removed {
                        *t -= 1;
                    }
                }
            }
        }

        match self.entry_point {
            Some(ep) if ep == removed => self.elect_entry_point(),
            Some(ep) if ep > removed => self.entry_point = Some(ep - 1),
            _ => {}
        }

        self.touch();
        Ok(())
    }

    /// Finds the `k` best nodes for `query` with beam width `ef`.
    ///
    /// Results are sorted strictly descending by score; ties resolve by
    /// ascending vector id. An empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for a wrong-sized query.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<(u64, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let Some(ep) = self.entry_point else {
            return Ok(Vec::new());
        };

        self.search_count.fetch_add(1, Ordering::Relaxed);

        let mut current = ep;
        for l in (1..=self.max_level).rev() {
            current = self.search_layer_single(query, current, l);
        }

        let mut hits = self.search_layer(query, current, ef.max(k), 0);
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|h| (self.nodes[h.node as usize].id, h.score))
            .collect())
    }

    /// Sweeps every edge, discarding targets that are out of range or below
    /// the edge's level, re-elects the entry point, and clears the integrity
    /// flag.
    pub fn repair(&mut self) {
        let levels: Vec<usize> = self.nodes.iter().map(|n| n.level).collect();

        for (i, node) in self.nodes.iter_mut().enumerate() {
            let own = u32::try_from(i).expect("arena indices fit in u32");
            for (l, conns) in node.connections.iter_mut().enumerate() {
                conns.retain(|&t| {
                    (t as usize) < levels.len() && t != own && levels[t as usize] >= l
                });
            }
        }

        self.elect_entry_point();
        self.corrupted.store(false, Ordering::Release);
        self.touch();
        tracing::debug!(nodes = self.nodes.len(), "hnsw repair complete");
    }

    /// Snapshot of index statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> HnswStats {
        let mut total_edges = 0usize;
        let mut memory = 0usize;
        for node in &self.nodes {
            let edges: usize = node.connections.iter().map(Vec::len).sum();
            total_edges += edges;
            memory += std::mem::size_of::<HnswNode>()
                + node.vector.len() * std::mem::size_of::<f32>()
                + edges * std::mem::size_of::<u32>();
        }

        let entry_point_level = self
            .entry_point
            .map_or(0, |ep| self.nodes[ep as usize].level);

        HnswStats {
            node_count: self.nodes.len(),
            max_level: self.max_level,
            entry_point_level,
            search_count: self.search_count.load(Ordering::Relaxed),
            distance_computations: self.distance_computations.load(Ordering::Relaxed),
            avg_connections_per_node: if self.nodes.is_empty() {
                0.0
            } else {
                total_edges as f32 / self.nodes.len() as f32
            },
            memory_bytes: memory as u64,
        }
    }

    /// Read access to the node arena, for persistence and diagnostics.
    #[must_use]
    pub fn nodes(&self) -> &[HnswNode] {
        &self.nodes
    }

    /// Arena index of the entry point, if any.
    #[must_use]
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Highest level currently in use.
    #[must_use]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    fn max_connections(&self, level: usize) -> usize {
        if level == 0 {
            self.params.m * 2
        } else {
            self.params.m
        }
    }

    fn touch(&mut self) {
        self.last_modified = unix_timestamp();
    }

    /// Re-elects the entry point as the highest-level node, ties broken by
    /// the smallest arena index.
    fn elect_entry_point(&mut self) {
        if self.nodes.is_empty() {
            self.entry_point = None;
            self.max_level = 0;
            return;
        }

        let mut best = 0usize;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.level > self.nodes[best].level {
                best = i;
            }
        }
        self.max_level = self.nodes[best].level;
        self.entry_point = Some(u32::try_from(best).expect("arena indices fit in u32"));
    }

    /// Draws a level from the exponential distribution, capped at
    /// [`MAX_LEVEL`]. Uses a process-local xorshift64 stream.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn random_level(&self) -> usize {
        let mut state = self.rng_state.load(Ordering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, Ordering::Relaxed);

        let uniform = (state as f64) / (u64::MAX as f64);
        let level = (-uniform.ln() * self.params.level_mult).floor() as usize;
        level.min(MAX_LEVEL)
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        self.distance_computations.fetch_add(1, Ordering::Relaxed);
        self.metric.score(a, b)
    }

    /// Greedy 1-nearest walk on a single layer: move to the best neighbor
    /// while one improves.
    fn search_layer_single(&self, query: &[f32], entry: u32, level: usize) -> u32 {
        let mut best = entry;
        let mut best_score = self.similarity(query, &self.nodes[best as usize].vector);

        loop {
            let node = &self.nodes[best as usize];
            let Some(neighbors) = node.connections.get(level) else {
                self.mark_corrupted();
                break;
            };

            let mut improved = false;
            for &nb in neighbors {
                let Some(nb_node) = self.nodes.get(nb as usize) else {
                    self.mark_corrupted();
                    continue;
                };
                let score = self.similarity(query, &nb_node.vector);
                if score > best_score {
                    best = nb;
                    best_score = score;
                    improved = true;
                }
            }

            if !improved {
                break;
            }
        }

        best
    }

    /// Beam search on one layer with a dynamic candidate set of width `ef`.
    ///
    /// The frontier pops the best unexplored candidate first; the result set
    /// keeps its worst member on top for cheap eviction. Terminates when the
    /// frontier's best cannot improve the full result set. Returns the
    /// results sorted best-first, ties by ascending vector id.
    fn search_layer(&self, query: &[f32], entry: u32, ef: usize, level: usize) -> Vec<HeapItem> {
        let ef = ef.max(1);
        let mut visited: FxHashSet<u32> = FxHashSet::default();
        let mut frontier = BoundedHeap::new(ef * 2, Orientation::Max);
        let mut best = BoundedHeap::new(ef, Orientation::Min);

        let entry_score = self.similarity(query, &self.nodes[entry as usize].vector);
        frontier.push(entry, entry_score);
        best.push(entry, entry_score);
        visited.insert(entry);

        while let Some(current) = frontier.pop() {
            if best.len() >= ef {
                if let Some(worst) = best.peek() {
                    if current.score < worst.score {
                        break;
                    }
                }
            }

            let node = &self.nodes[current.node as usize];
            let Some(neighbors) = node.connections.get(level) else {
                self.mark_corrupted();
                continue;
            };

            for &nb in neighbors {
                let Some(nb_node) = self.nodes.get(nb as usize) else {
                    self.mark_corrupted();
                    continue;
                };
                if !visited.insert(nb) {
                    continue;
                }

                let score = self.similarity(query, &nb_node.vector);
                let admit = !best.is_full()
                    || best.peek().is_some_and(|worst| score > worst.score);
                if admit {
                    if best.is_full() {
                        best.pop();
                    }
                    best.push(nb, score);
                    // A full frontier drops the candidate; the beam is bounded.
                    frontier.push(nb, score);
                }
            }
        }

        let mut results = best.into_vec();
        results.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| {
                self.nodes[a.node as usize]
                    .id
                    .cmp(&self.nodes[b.node as usize].id)
            })
        });
        results
    }
}
