//! Levenberg-Marquardt fit of the wavenumber scale correction.
//!
//! Given matched `(measured, standard)` wavenumbers we solve for the single
//! parameter `ε` minimising
//!
//! ```text
//! Σ [ (m_i (1 + ε) - s_i) * DATA_SCALE / s_i ]²
//! ```
//!
//! The residuals are linear in `ε`, so the Jacobian is constant and the
//! solver normally finishes in a couple of steps. It is still run as a
//! general nonlinear least-squares problem, warm-started from the current
//! estimate, so that further parameters can be added without restructuring.
//!
//! The reported uncertainty is the formal error `sqrt((JᵀJ)⁻¹)` rescaled by
//! `χ/√dof`, which ties it to the observed residual scatter.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{DMatrix, DVector, Dyn, storage::Owned};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CalibrationError;
use crate::math::{covariance, gauss_newton_step};
use crate::models::{normalized_residual, residual_slope};

/// Number of free parameters in the model.
pub const FREE_PARAMETERS: usize = 1;

/// Fewest fitted lines that leave at least one degree of freedom.
pub const MIN_FITTED_LINES: usize = FREE_PARAMETERS + 1;

/// Convergence settings for the scale fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Absolute and relative tolerance on the change in `ε` and in the cost.
    pub tolerance: f64,
    /// Iteration budget. Running out is reported but not fatal.
    pub max_iterations: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-12,
            max_iterations: 500,
        }
    }
}

/// One matched line as seen by the fitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePoint {
    /// Line index in the uncalibrated list, for diagnostics.
    pub index: i32,
    pub measured: f64,
    pub standard: f64,
}

impl ScalePoint {
    pub fn residual(&self, epsilon: f64) -> f64 {
        normalized_residual(self.measured, self.standard, epsilon)
    }
}

/// Outcome of one scale fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub epsilon: f64,
    /// One-sigma uncertainty in `epsilon`, scaled by `χ/√dof`.
    pub uncertainty: f64,
    /// `χ²` in `DATA_SCALE` units.
    pub chi_squared: f64,
    pub reduced_chi_squared: f64,
    pub dof: usize,
    pub lines: usize,
    pub evaluations: usize,
    pub converged: bool,
}

struct ScaleProblem<'a> {
    points: &'a [ScalePoint],
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for ScaleProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(residual_vector(self.points, self.params[0]))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(jacobian_matrix(self.points))
    }
}

fn residual_vector(points: &[ScalePoint], epsilon: f64) -> DVector<f64> {
    DVector::from_iterator(points.len(), points.iter().map(|p| p.residual(epsilon)))
}

fn jacobian_matrix(points: &[ScalePoint]) -> DMatrix<f64> {
    DMatrix::from_iterator(
        points.len(),
        FREE_PARAMETERS,
        points.iter().map(|p| residual_slope(p.measured, p.standard)),
    )
}

/// Closed-form correction: one Gauss-Newton step from `initial`.
///
/// The residuals are linear in `ε`, so the step lands on the minimum.
fn linear_solution(points: &[ScalePoint], initial: f64) -> Option<f64> {
    let step = gauss_newton_step(&jacobian_matrix(points), &residual_vector(points, initial))?;
    Some(initial + step[0])
}

/// Fit the scale correction, starting from `initial`.
pub fn fit_scale(
    points: &[ScalePoint],
    initial: f64,
    opts: &SolverOptions,
) -> Result<FitReport, CalibrationError> {
    if points.len() < MIN_FITTED_LINES {
        return Err(CalibrationError::DegenerateFit {
            fitted: points.len(),
            required: MIN_FITTED_LINES,
        });
    }
    if let Some(bad) = points
        .iter()
        .find(|p| !(p.residual(initial).is_finite() && residual_slope(p.measured, p.standard).is_finite()))
    {
        return Err(CalibrationError::NonFiniteResidual { index: bad.index });
    }

    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.tolerance)
        .with_xtol(opts.tolerance)
        .with_gtol(f64::EPSILON)
        .with_patience(opts.max_iterations.max(1));

    let problem = ScaleProblem {
        points,
        params: DVector::from_element(FREE_PARAMETERS, initial),
    };
    let (problem, report) = lm.minimize(problem);
    let mut converged = report.termination.was_successful();
    let mut epsilon = problem.params[0];

    if !epsilon.is_finite() {
        warn!(termination = ?report.termination, "LM step failed, using linear solution");
        epsilon = linear_solution(points, initial).ok_or(CalibrationError::DegenerateFit {
            fitted: points.len(),
            required: MIN_FITTED_LINES,
        })?;
        converged = false;
    } else if !converged {
        warn!(
            termination = ?report.termination,
            evaluations = report.number_of_evaluations,
            "scale fit did not converge, using the last estimate"
        );
    }

    let residuals = residual_vector(points, epsilon);
    let chi = residuals.norm();
    let dof = points.len() - FREE_PARAMETERS;
    let c = chi / (dof as f64).sqrt();

    let uncertainty = match covariance(&jacobian_matrix(points)) {
        Some(cov) => c * cov[(0, 0)].sqrt(),
        None => {
            warn!("singular Jacobian, correction uncertainty is undefined");
            f64::INFINITY
        }
    };

    let fit = FitReport {
        epsilon,
        uncertainty,
        chi_squared: chi * chi,
        reduced_chi_squared: chi * chi / dof as f64,
        dof,
        lines: points.len(),
        evaluations: report.number_of_evaluations,
        converged,
    };
    info!(
        epsilon = fit.epsilon,
        uncertainty = fit.uncertainty,
        reduced_chi_squared = fit.reduced_chi_squared,
        lines = fit.lines,
        c,
        "correction factor"
    );
    Ok(fit)
}
