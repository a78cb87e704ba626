//! Binary save/load for the HNSW graph.
//!
//! The engine rebuilds its index from the vector log on open, so this format
//! is a diagnostic and backup artifact rather than the recovery path. All
//! multi-byte fields are little-endian.

use super::{HnswIndex, HnswNode, HnswParams, MAX_LEVEL};
use crate::error::{Error, Result};
use crate::similarity::DistanceMetric;
use crate::util::unix_timestamp;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64};

/// Magic prefix of an index file ("HNSW").
pub const HNSW_MAGIC: u32 = 0x484E_5357;

/// Current index file version.
pub const HNSW_VERSION: u32 = 1;

/// Sentinel meaning "no entry point" in the serialized form.
const NO_ENTRY_POINT: u32 = u32::MAX;

impl HnswIndex {
    /// Writes the graph to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);

        w.write_all(&HNSW_MAGIC.to_le_bytes())?;
        w.write_all(&HNSW_VERSION.to_le_bytes())?;
        w.write_all(&u32_of(self.dimension)?.to_le_bytes())?;
        w.write_all(&self.metric.as_u32().to_le_bytes())?;
        w.write_all(&u32_of(self.params.m)?.to_le_bytes())?;
        w.write_all(&u32_of(self.params.ef_construction)?.to_le_bytes())?;
        w.write_all(&u32_of(self.params.ef_search)?.to_le_bytes())?;
        #[allow(clippy::cast_possible_truncation)]
        w.write_all(&(self.params.level_mult as f32).to_le_bytes())?;
        w.write_all(&u32_of(self.nodes.len())?.to_le_bytes())?;
        w.write_all(&self.entry_point.unwrap_or(NO_ENTRY_POINT).to_le_bytes())?;
        w.write_all(&u32_of(self.max_level)?.to_le_bytes())?;

        for node in &self.nodes {
            w.write_all(&node.id.to_le_bytes())?;
            w.write_all(&u32_of(node.level)?.to_le_bytes())?;
            w.write_all(&u32_of(node.vector.len())?.to_le_bytes())?;
            for value in &node.vector {
                w.write_all(&value.to_le_bytes())?;
            }
            for conns in &node.connections {
                w.write_all(&u32_of(conns.len())?.to_le_bytes())?;
                for target in conns {
                    w.write_all(&target.to_le_bytes())?;
                }
            }
        }

        w.flush()?;
        Ok(())
    }

    /// Loads a graph previously written by [`HnswIndex::save`].
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` on a bad magic, unsupported version, or an
    /// internally inconsistent file; I/O errors pass through.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut r = BufReader::new(file);

        let magic = read_u32(&mut r)?;
        let version = read_u32(&mut r)?;
        if magic != HNSW_MAGIC {
            return Err(Error::Corrupt("bad hnsw index magic".to_string()));
        }
        if version != HNSW_VERSION {
            return Err(Error::Corrupt(format!(
                "unsupported hnsw index version {version}"
            )));
        }

        let dimension = read_u32(&mut r)? as usize;
        let metric_code = read_u32(&mut r)?;
        let metric = DistanceMetric::from_u32(metric_code)
            .ok_or_else(|| Error::Corrupt(format!("unknown metric code {metric_code}")))?;
        let m = read_u32(&mut r)? as usize;
        let ef_construction = read_u32(&mut r)? as usize;
        let ef_search = read_u32(&mut r)? as usize;
        let level_mult = f64::from(read_f32(&mut r)?);
        let node_count = read_u32(&mut r)? as usize;
        let entry_point_raw = read_u32(&mut r)?;
        let max_level = read_u32(&mut r)? as usize;

        if max_level > MAX_LEVEL {
            return Err(Error::Corrupt(format!(
                "max level {max_level} exceeds cap {MAX_LEVEL}"
            )));
        }

        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let id = read_u64(&mut r)?;
            let level = read_u32(&mut r)? as usize;
            if level > MAX_LEVEL {
                return Err(Error::Corrupt(format!("node level {level} exceeds cap")));
            }
            let node_dim = read_u32(&mut r)? as usize;
            if node_dim != dimension {
                return Err(Error::Corrupt(format!(
                    "node dimension {node_dim} disagrees with index dimension {dimension}"
                )));
            }

            let mut vector = Vec::with_capacity(node_dim);
            for _ in 0..node_dim {
                vector.push(read_f32(&mut r)?);
            }

            let mut connections = Vec::with_capacity(level + 1);
            for _ in 0..=level {
                let count = read_u32(&mut r)? as usize;
                let mut conns = Vec::with_capacity(count);
                for _ in 0..count {
                    conns.push(read_u32(&mut r)?);
                }
                connections.push(conns);
            }

            nodes.push(HnswNode {
                id,
                level,
                vector,
                connections,
            });
        }

        let entry_point = if entry_point_raw == NO_ENTRY_POINT {
            None
        } else {
            if entry_point_raw as usize >= nodes.len() {
                return Err(Error::Corrupt("entry point out of range".to_string()));
            }
            Some(entry_point_raw)
        };

        let seed = unix_timestamp().wrapping_mul(0x9E37_79B9_7F4A_7C15).max(1) | 1;
        Ok(Self {
            nodes,
            entry_point,
            max_level,
            dimension,
            metric,
            params: HnswParams {
                m,
                ef_construction,
                ef_search,
                level_mult,
            },
            rng_state: AtomicU64::new(seed),
            search_count: AtomicU64::new(0),
            distance_computations: AtomicU64::new(0),
            corrupted: AtomicBool::new(false),
            last_modified: unix_timestamp(),
        })
    }
}

fn u32_of(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::OutOfMemory("value exceeds u32 in hnsw index file".to_string()))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}
