//! Little-endian conversion between f32 slices and raw bytes.
//!
//! The log fixes little-endian on disk regardless of host order, so the
//! conversions are explicit rather than pointer casts.

/// Encodes a vector as little-endian bytes.
#[must_use]
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes little-endian bytes into a vector. Trailing bytes that do not
/// form a full f32 are ignored.
#[must_use]
pub fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
