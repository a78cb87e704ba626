//! Similarity metrics for vector comparisons.

use serde::{Deserialize, Serialize};

/// Similarity metric for vector comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity. Best for normalized text embeddings.
    Cosine,

    /// Dot product (inner product). Best for maximum inner product search.
    DotProduct,

    /// Euclidean distance (L2 norm). Best when magnitude matters.
    Euclidean,
}

impl DistanceMetric {
    /// Calculates the raw metric value between two vectors.
    ///
    /// Cosine and dot product return a similarity; Euclidean returns a
    /// *distance*. Use [`DistanceMetric::score`] for a uniform
    /// higher-is-better quantity.
    ///
    /// Equal-length inputs are the caller's contract; a mismatch is a
    /// programmer error caught upstream.
    #[must_use]
    pub fn calculate(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::DotProduct => dot_product(a, b),
            Self::Euclidean => euclidean_distance(a, b),
        }
    }

    /// Calculates a score for which higher always means more similar.
    ///
    /// For Euclidean the distance is negated so all metrics rank the same
    /// direction.
    #[must_use]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::DotProduct => dot_product(a, b),
            Self::Euclidean => -euclidean_distance(a, b),
        }
    }

    /// Returns the on-disk code for this metric.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Cosine => 0,
            Self::DotProduct => 1,
            Self::Euclidean => 2,
        }
    }

    /// Parses an on-disk metric code.
    #[must_use]
    pub const fn from_u32(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Cosine),
            1 => Some(Self::DotProduct),
            2 => Some(Self::Euclidean),
            _ => None,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::DotProduct => write!(f, "dot_product"),
            Self::Euclidean => write!(f, "euclidean"),
        }
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0 when either norm is below `f32::EPSILON`, so the zero vector is
/// equally dissimilar to everything.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Dot product of two equal-length vectors.
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) distance between two equal-length vectors.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

/// L2 norm of a vector.
#[must_use]
pub fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalizes a vector in place. A near-zero vector is left untouched.
pub fn normalize(vector: &mut [f32]) {
    let n = norm(vector);
    if n < f32::EPSILON {
        return;
    }
    for x in vector.iter_mut() {
        *x /= n;
    }
}
