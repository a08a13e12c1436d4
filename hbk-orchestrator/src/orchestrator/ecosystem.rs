//! Ecosystem cache
//!
//! Aggregate spectral footprint of every active niche:
//! - `raw_sum`: elementwise sum of the niches' raw bands
//! - `norm`: `raw_sum` scaled to unit length (zero when nothing is active)
//!
//! Updated incrementally on every admit/free so a conflict check is O(1) in
//! the number of active niches. [`Ecosystem::from_signatures`] rebuilds from
//! scratch and exists to verify the incremental path.

use hbk_common::signature::{normalize, BandVector};
use hbk_common::{SpectralSignature, BARK_BANDS};

/// Absolute tolerance when comparing incremental and recomputed sums
const DRIFT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Ecosystem {
    raw_sum: BandVector,
    norm: BandVector,
}

impl Ecosystem {
    /// Silent ecosystem
    pub fn new() -> Self {
        Self {
            raw_sum: [0.0; BARK_BANDS],
            norm: [0.0; BARK_BANDS],
        }
    }

    /// Full recompute from a set of signatures
    pub fn from_signatures<'a>(signatures: impl IntoIterator<Item = &'a SpectralSignature>) -> Self {
        let mut raw_sum = [0.0; BARK_BANDS];
        for signature in signatures {
            accumulate(&mut raw_sum, signature);
        }
        Self {
            norm: normalize(&raw_sum),
            raw_sum,
        }
    }

    /// Add a niche's energy
    pub fn add(&mut self, signature: &SpectralSignature) {
        accumulate(&mut self.raw_sum, signature);
        self.norm = normalize(&self.raw_sum);
    }

    /// Remove a niche's energy
    ///
    /// Rounding can leave tiny negative residues; those are clamped to zero
    /// because the true sum of non-negative bands cannot go below it.
    pub fn remove(&mut self, signature: &SpectralSignature) {
        for (sum, band) in self.raw_sum.iter_mut().zip(signature.bands().iter()) {
            *sum = (*sum - band).max(0.0);
        }
        self.norm = normalize(&self.raw_sum);
    }

    /// Back to silence (exact zeros)
    pub fn reset(&mut self) {
        self.raw_sum = [0.0; BARK_BANDS];
        self.norm = [0.0; BARK_BANDS];
    }

    pub fn raw_sum(&self) -> &BandVector {
        &self.raw_sum
    }

    pub fn norm(&self) -> &BandVector {
        &self.norm
    }

    /// Equal to `other` within rounding tolerance
    pub fn approx_eq(&self, other: &Ecosystem) -> bool {
        let close = |a: &BandVector, b: &BandVector| {
            a.iter()
                .zip(b.iter())
                .all(|(x, y)| (x - y).abs() <= DRIFT_TOLERANCE * x.abs().max(y.abs()).max(1.0))
        };
        close(&self.raw_sum, &other.raw_sum) && close(&self.norm, &other.norm)
    }
}

/// Elementwise add, saturating at `f64::MAX` so the sum stays finite
fn accumulate(raw_sum: &mut BandVector, signature: &SpectralSignature) {
    for (sum, band) in raw_sum.iter_mut().zip(signature.bands().iter()) {
        *sum = (*sum + band).min(f64::MAX);
    }
}

impl Default for Ecosystem {
    fn default() -> Self {
        Self::new()
    }
}
