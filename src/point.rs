//! Immutable fixed-dimension real vector with cache-key semantics.
//!
//! A [`Point`] is the currency of the whole crate: the optimizer moves
//! simplex vertices around as points, and the evaluation cache keys its
//! table by point. Equality and hashing are bitwise per coordinate
//! (`f64::to_bits`), so two points constructed from the same coordinate
//! sequence hash identically and the cache never recomputes them.
//!
//! The coordinate storage is shared (`Arc<[f64]>`), making clones cheap
//! enough to use points freely as map keys and across worker threads.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An immutable point in n-dimensional space.
///
/// All arithmetic returns new points; mixing dimensions panics. Every point
/// participating in one optimization run shares the same dimension.
#[derive(Debug, Clone)]
pub struct Point {
    coords: Arc<[f64]>,
}

impl Point {
    /// Create a point from a coordinate vector.
    ///
    /// # Panics
    /// Panics if `coords` is empty.
    pub fn new(coords: Vec<f64>) -> Self {
        assert!(!coords.is_empty(), "point must have at least one dimension");
        Self {
            coords: coords.into(),
        }
    }

    /// Create a point with all `dim` coordinates set to `value`.
    pub fn uniform(dim: usize, value: f64) -> Self {
        Self::new(vec![value; dim])
    }

    /// Create a point that is zero everywhere except coordinate `index`,
    /// which is set to `value`. Used to perturb a starting point along one
    /// coordinate axis when building the initial simplex.
    ///
    /// # Panics
    /// Panics if `index >= dim`.
    pub fn axis(dim: usize, index: usize, value: f64) -> Self {
        assert!(index < dim, "axis index {index} out of range for dim {dim}");
        let mut coords = vec![0.0; dim];
        coords[index] = value;
        Self::new(coords)
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Coordinates as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }

    /// Component-wise sum `self + other`.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    pub fn add(&self, other: &Point) -> Point {
        self.zip_with(other, |a, b| a + b)
    }

    /// Component-wise difference `self - other`.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    pub fn sub(&self, other: &Point) -> Point {
        self.zip_with(other, |a, b| a - b)
    }

    /// Scale every coordinate by `factor`.
    pub fn scale(&self, factor: f64) -> Point {
        Point {
            coords: self.coords.iter().map(|&c| c * factor).collect(),
        }
    }

    /// Euclidean norm.
    pub fn length(&self) -> f64 {
        self.length2().sqrt()
    }

    /// Squared Euclidean norm. Cheaper than [`length`](Self::length) when
    /// only comparisons are needed.
    pub fn length2(&self) -> f64 {
        self.coords.iter().map(|&c| c * c).sum()
    }

    fn zip_with(&self, other: &Point, f: impl Fn(f64, f64) -> f64) -> Point {
        assert_eq!(
            self.dim(),
            other.dim(),
            "dimension mismatch: {} vs {}",
            self.dim(),
            other.dim()
        );
        Point {
            coords: self
                .coords
                .iter()
                .zip(other.coords.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

impl From<Vec<f64>> for Point {
    fn from(coords: Vec<f64>) -> Self {
        Self::new(coords)
    }
}

impl From<&[f64]> for Point {
    fn from(coords: &[f64]) -> Self {
        Self::new(coords.to_vec())
    }
}

// Bitwise coordinate equality. This deliberately distinguishes 0.0 from
// -0.0 and treats identical NaN bit patterns as equal, matching the hash
// below; the cache contract only needs "same coordinates in, same entry
// out".
impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.coords.len() == other.coords.len()
            && self
                .coords
                .iter()
                .zip(other.coords.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.coords.iter() {
            state.write_u64(c.to_bits());
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}
