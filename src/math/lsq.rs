//! Normal-equation helpers for the scale fit.
//!
//! The calibration residuals are linear in the scale correction, so the
//! parameter covariance `(JᵀJ)⁻¹` also gives the exact least-squares step:
//! - the formal uncertainty of the fitted correction
//! - a fallback solution when the Levenberg-Marquardt step fails numerically

use nalgebra::{DMatrix, DVector};

/// Unscaled parameter covariance `(JᵀJ)⁻¹`.
///
/// Returns `None` when `JᵀJ` is singular (e.g. an all-zero Jacobian column).
pub fn covariance(jacobian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let jtj = jacobian.transpose() * jacobian;
    let cov = jtj.pseudo_inverse(1e-300).ok()?;
    if cov.iter().all(|v| v.is_finite()) && cov.diagonal().iter().all(|v| *v > 0.0) {
        Some(cov)
    } else {
        None
    }
}

/// Gauss-Newton step `-(JᵀJ)⁻¹ Jᵀ r` that minimises `‖r + J δ‖²`.
pub fn gauss_newton_step(jacobian: &DMatrix<f64>, residuals: &DVector<f64>) -> Option<DVector<f64>> {
    let cov = covariance(jacobian)?;
    let step = -(cov * jacobian.transpose() * residuals);
    step.iter().all(|v| v.is_finite()).then_some(step)
}
