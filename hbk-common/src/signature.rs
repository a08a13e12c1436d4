//! Bark-band spectral signatures
//!
//! A signature is the frequency-domain fingerprint of a clip: 24 raw energies,
//! one per Bark critical band (0 Hz to ~15.5 kHz), plus their L2 norm.
//!
//! Signatures are produced by an external analysis step. Everything here only
//! validates and compares them; the orchestrator never computes one.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of Bark critical bands in a signature
pub const BARK_BANDS: usize = 24;

/// Raw band energies, fixed length
pub type BandVector = [f64; BARK_BANDS];

/// Validated 24-band energy vector
///
/// Invariants (checked on construction, never re-checked):
/// - exactly [`BARK_BANDS`] values
/// - every value finite and non-negative
///
/// Serializes as a plain JSON array of the raw energies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SpectralSignature {
    bands: BandVector,
    norm: f64,
}

impl SpectralSignature {
    /// Validate raw band energies and build a signature
    ///
    /// Rejects wrong lengths, NaN/infinite values and negative energies.
    /// Nothing is coerced: malformed input is an error for the caller.
    pub fn new(raw: &[f64]) -> Result<Self> {
        if raw.len() != BARK_BANDS {
            return Err(Error::InvalidSignature(format!(
                "expected {} bands, got {}",
                BARK_BANDS,
                raw.len()
            )));
        }

        let mut bands = [0.0; BARK_BANDS];
        for (i, &value) in raw.iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::InvalidSignature(format!(
                    "band {} is not finite ({})",
                    i, value
                )));
            }
            if value < 0.0 {
                return Err(Error::InvalidSignature(format!(
                    "band {} is negative ({})",
                    i, value
                )));
            }
            bands[i] = value;
        }

        let norm = vector_norm(&bands);
        if !norm.is_finite() {
            return Err(Error::InvalidSignature(
                "band energies too large, norm overflows".to_string(),
            ));
        }

        Ok(Self { bands, norm })
    }

    /// All-zero signature (silence)
    pub fn zero() -> Self {
        Self {
            bands: [0.0; BARK_BANDS],
            norm: 0.0,
        }
    }

    /// Raw band energies
    pub fn bands(&self) -> &BandVector {
        &self.bands
    }

    /// L2 norm of the raw energies
    pub fn norm(&self) -> f64 {
        self.norm
    }

    /// True when every band is zero
    pub fn is_silent(&self) -> bool {
        self.norm == 0.0
    }

    /// Unit-length copy of the bands (zero vector stays zero)
    pub fn normalized(&self) -> BandVector {
        normalize(&self.bands)
    }
}

impl TryFrom<Vec<f64>> for SpectralSignature {
    type Error = Error;

    fn try_from(raw: Vec<f64>) -> Result<Self> {
        Self::new(&raw)
    }
}

impl From<SpectralSignature> for Vec<f64> {
    fn from(signature: SpectralSignature) -> Self {
        signature.bands.to_vec()
    }
}

/// L2 norm of a vector
///
/// Scaled by the largest magnitude before squaring, so any vector of finite
/// values whose true norm is representable gets a finite result.
pub fn vector_norm(v: &[f64]) -> f64 {
    match scaled_sum_of_squares(v) {
        Some((scale, sum)) => scale * sum.sqrt(),
        None => 0.0,
    }
}

/// Largest magnitude and the sum of squares of `v / scale`
///
/// `None` for the zero vector.
fn scaled_sum_of_squares(v: &[f64]) -> Option<(f64, f64)> {
    let scale = v.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if scale == 0.0 {
        return None;
    }
    let sum = v.iter().map(|x| (x / scale) * (x / scale)).sum::<f64>();
    Some((scale, sum))
}

/// Scale a band vector to unit length
///
/// `normalize(0) == 0`: a zero vector has no direction and is returned as is.
pub fn normalize(v: &BandVector) -> BandVector {
    let mut out = [0.0; BARK_BANDS];
    let Some((scale, sum)) = scaled_sum_of_squares(v) else {
        return out;
    };
    let length = sum.sqrt();
    for (o, x) in out.iter_mut().zip(v.iter()) {
        *o = (x / scale) / length;
    }
    out
}

/// Cosine similarity between two band vectors, clamped to [-1.0, 1.0]
///
/// Returns 0.0 when either side is the zero vector. Both sides are
/// normalized first, so the result does not depend on magnitude.
pub fn cosine_similarity(a: &BandVector, b: &BandVector) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(index: usize, value: f64) -> Vec<f64> {
        let mut raw = vec![0.0; BARK_BANDS];
        raw[index] = value;
        raw
    }

    #[test]
    fn test_new_accepts_valid_bands() {
        let sig = SpectralSignature::new(&band(3, 2.0)).unwrap();
        assert_eq!(sig.bands()[3], 2.0);
        assert_eq!(sig.norm(), 2.0);
        assert!(!sig.is_silent());
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = SpectralSignature::new(&[1.0; 23]).unwrap_err();
        assert!(matches!(err, Error::InvalidSignature(_)));
        assert!(SpectralSignature::new(&[1.0; 25]).is_err());
        assert!(SpectralSignature::new(&[]).is_err());
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(SpectralSignature::new(&band(0, f64::NAN)).is_err());
        assert!(SpectralSignature::new(&band(5, f64::INFINITY)).is_err());
        assert!(SpectralSignature::new(&band(5, f64::NEG_INFINITY)).is_err());
    }

    #[test]
    fn test_new_rejects_negative() {
        let err = SpectralSignature::new(&band(7, -0.5)).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_zero_signature() {
        let sig = SpectralSignature::zero();
        assert!(sig.is_silent());
        assert_eq!(sig.normalized(), [0.0; BARK_BANDS]);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = [0.0; BARK_BANDS];
        v[0] = 3.0;
        v[1] = 4.0;
        let n = normalize(&v);
        assert!((n[0] - 0.6).abs() < 1e-12);
        assert!((n[1] - 0.8).abs() < 1e-12);
        assert!((vector_norm(&n) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_vector_stays_zero() {
        assert_eq!(normalize(&[0.0; BARK_BANDS]), [0.0; BARK_BANDS]);
    }

    #[test]
    fn test_cosine_similarity_cases() {
        let a = SpectralSignature::new(&band(0, 1.0)).unwrap();
        let b = SpectralSignature::new(&band(0, 5.0)).unwrap();
        let c = SpectralSignature::new(&band(1, 1.0)).unwrap();

        assert_eq!(cosine_similarity(a.bands(), b.bands()), 1.0);
        assert_eq!(cosine_similarity(a.bands(), c.bands()), 0.0);
        assert_eq!(cosine_similarity(a.bands(), &[0.0; BARK_BANDS]), 0.0);
    }

    #[test]
    fn test_large_bands_do_not_overflow() {
        let huge = SpectralSignature::new(&band(0, 1e200)).unwrap();
        assert_eq!(huge.norm(), 1e200);
        assert_eq!(huge.normalized()[0], 1.0);
        assert_eq!(cosine_similarity(huge.bands(), huge.bands()), 1.0);

        let mut max = [f64::MAX; BARK_BANDS];
        max[1] = 0.0;
        let n = normalize(&max);
        assert!(n.iter().all(|x| x.is_finite()));
        assert!((n.iter().map(|x| x * x).sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((cosine_similarity(&max, &max) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_rejects_overflowing_norm() {
        let err = SpectralSignature::new(&[f64::MAX; BARK_BANDS]).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_tiny_bands_keep_direction() {
        let tiny = SpectralSignature::new(&band(4, 1e-300)).unwrap();
        assert_eq!(tiny.normalized()[4], 1.0);
        assert!(!tiny.is_silent());
    }

    #[test]
    fn test_serde_as_plain_array() {
        let sig = SpectralSignature::new(&band(2, 1.5)).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        assert!(json.starts_with('['));

        let back: SpectralSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);

        let short: std::result::Result<SpectralSignature, _> = serde_json::from_str("[1.0, 2.0]");
        assert!(short.is_err());
    }
}
