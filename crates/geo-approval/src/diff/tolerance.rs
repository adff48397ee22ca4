//! Numeric tolerance policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::DiffError;
use crate::utils::config::{DEFAULT_ABS_TOLERANCE, DEFAULT_REL_TOLERANCE};

/// Relative and absolute epsilon for float comparison
///
/// `received` is close to `approved` when
/// `|received - approved| <= abs + rel * |approved|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub rel: f64,
    pub abs: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rel: DEFAULT_REL_TOLERANCE,
            abs: DEFAULT_ABS_TOLERANCE,
        }
    }
}

impl Tolerance {
    /// Build a tolerance, rejecting negative or non-finite values
    pub fn new(rel: f64, abs: f64) -> Result<Self, DiffError> {
        let tolerance = Self { rel, abs };
        tolerance.validate()?;
        Ok(tolerance)
    }

    /// Exact comparison (NaN still equals NaN)
    pub fn exact() -> Self {
        Self { rel: 0.0, abs: 0.0 }
    }

    pub fn validate(&self) -> Result<(), DiffError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if valid(self.rel) && valid(self.abs) {
            Ok(())
        } else {
            Err(DiffError::InvalidTolerance {
                rel: self.rel,
                abs: self.abs,
            })
        }
    }

    /// Whether a received value is within tolerance of the approved one
    ///
    /// Two missing values compare equal; a missing value never equals a
    /// present one.
    pub fn is_close(&self, received: f64, approved: f64) -> bool {
        if received.is_nan() || approved.is_nan() {
            return received.is_nan() && approved.is_nan();
        }
        if received == approved {
            return true;
        }
        (received - approved).abs() <= self.abs + self.rel * approved.abs()
    }

    /// Both epsilons under the names an allclose routine expects
    pub fn to_comparison_kwargs(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([("rtol", self.rel), ("atol", self.abs)])
    }

    /// True when `self` accepts everything `other` accepts
    pub fn covers(&self, other: &Tolerance) -> bool {
        self.rel >= other.rel && self.abs >= other.abs
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rtol={}, atol={}", self.rel, self.abs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_near_exact() {
        let tolerance = Tolerance::default();
        assert_eq!(tolerance.rel, 1e-9);
        assert_eq!(tolerance.abs, 0.0);
        assert!(tolerance.is_close(1.0, 1.0 + 1e-10));
        assert!(!tolerance.is_close(1.0, 1.0 + 1e-6));
    }

    #[test]
    fn test_relative_term_scales_with_approved_value() {
        let tolerance = Tolerance::new(0.008, 0.0021).unwrap();
        // 0.01 <= 0.0021 + 0.008 * 1.0
        assert!(tolerance.is_close(-1.01, -1.0));
        assert!(!tolerance.is_close(-1.02, -1.0));
    }

    #[test]
    fn test_nan_handling() {
        let tolerance = Tolerance::default();
        assert!(tolerance.is_close(f64::NAN, f64::NAN));
        assert!(!tolerance.is_close(f64::NAN, 0.0));
        assert!(!tolerance.is_close(0.0, f64::NAN));
        assert!(tolerance.is_close(f64::INFINITY, f64::INFINITY));
    }

    #[test]
    fn test_rejects_negative_values() {
        assert!(matches!(
            Tolerance::new(-1.0, 0.0),
            Err(DiffError::InvalidTolerance { .. })
        ));
        assert!(Tolerance::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_kwargs_export() {
        let kwargs = Tolerance::new(0.5, 0.25).unwrap().to_comparison_kwargs();
        assert_eq!(kwargs["rtol"], 0.5);
        assert_eq!(kwargs["atol"], 0.25);
    }
}
