//! Outlier rejection between fits.
//!
//! After every fit each fitted line is compared against the residual
//! statistics. Lines with `|r - mean| > |mean| + k·σ` move to the discarded
//! set and the fit is repeated. Removing lines changes both the mean and σ,
//! so every pass re-evaluates the full fitted set from scratch.
//!
//! The loop has no iteration cap. It ends because the fitted set is finite
//! and only ever shrinks: either a pass removes nothing, or the set becomes
//! too small to fit and the fitter reports a degenerate fit.

use serde::{Deserialize, Serialize};

use crate::math::ResidualStats;

/// States of the fit / reject cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionState {
    Fitting,
    Evaluating,
    Refitting,
    Converged,
}

/// A line moved out of the fitted set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discard {
    /// Index into the pair list.
    pub pair: usize,
    pub residual: f64,
    pub limit: f64,
}

/// Summary of one fit + evaluate pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RejectionPass {
    pub pass: usize,
    pub lines_fitted: usize,
    pub lines_removed: usize,
    pub epsilon: f64,
    pub uncertainty: f64,
    /// Residual standard deviation, `DATA_SCALE` units.
    pub std_dev: f64,
    /// Residual evaluations used by the solver in this pass.
    pub evaluations: usize,
    pub solver_converged: bool,
}

/// Move every outlier from `fitted` to `discarded`.
///
/// `fitted` is scanned from the back so in-place removal never shifts an
/// entry that has not been visited yet. `residual` maps a pair index to its
/// current normalized residual.
pub fn discard_outliers<F>(
    fitted: &mut Vec<usize>,
    discarded: &mut Vec<usize>,
    stats: &ResidualStats,
    multiplier: f64,
    residual: F,
) -> Vec<Discard>
where
    F: Fn(usize) -> f64,
{
    let limit = stats.discard_limit(multiplier);
    let mut removed = Vec::new();

    for i in (0..fitted.len()).rev() {
        let pair = fitted[i];
        let r = residual(pair);
        if stats.is_outlier(r, multiplier) {
            fitted.remove(i);
            discarded.push(pair);
            removed.push(Discard {
                pair,
                residual: r,
                limit,
            });
        }
    }

    removed
}
