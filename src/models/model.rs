//! Scale-correction model.
//!
//! Calibrated wavenumbers are `σ_cal = σ_measured * (1 + ε)`. The fitter and
//! the residual statistics rely on two primitive operations:
//! - the normalized residual `dσ/σ` of one pair for a given `ε`
//! - its derivative with respect to `ε` (for the Jacobian)
//!
//! Both are expressed in `DATA_SCALE` units.

use crate::domain::DATA_SCALE;

/// Normalized residual `(m (1 + ε) - s) * DATA_SCALE / s`.
pub fn normalized_residual(measured: f64, standard: f64, epsilon: f64) -> f64 {
    (measured * (1.0 + epsilon) - standard) * DATA_SCALE / standard
}

/// `∂r/∂ε` for one pair. The model is linear in `ε`, so this does not depend on it.
pub fn residual_slope(measured: f64, standard: f64) -> f64 {
    measured * DATA_SCALE / standard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_vanishes_at_exact_correction() {
        let (m, s) = (9999.95, 10000.0);
        let eps = s / m - 1.0;
        assert!(normalized_residual(m, s, eps).abs() < 1e-6);
    }

    #[test]
    fn slope_matches_finite_difference() {
        let (m, s) = (20000.1, 20000.0);
        let h = 1e-9;
        let fd = (normalized_residual(m, s, h) - normalized_residual(m, s, -h)) / (2.0 * h);
        let rel = (fd - residual_slope(m, s)).abs() / residual_slope(m, s);
        assert!(rel < 1e-5, "finite difference {fd} vs slope {}", residual_slope(m, s));
    }
}
