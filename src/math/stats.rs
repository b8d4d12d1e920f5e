//! Residual statistics.

use serde::{Deserialize, Serialize};

/// Mean, population standard deviation and standard error of a residual set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
    pub n: usize,
}

impl ResidualStats {
    /// Two-pass statistics: the mean first, then the variance about it.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_residuals(residuals: &[f64]) -> Option<Self> {
        if residuals.is_empty() {
            return None;
        }
        let n = residuals.len() as f64;
        let mean = residuals.iter().sum::<f64>() / n;
        let var = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = var.sqrt();
        Some(Self {
            mean,
            std_dev,
            std_err: std_dev / n.sqrt(),
            n: residuals.len(),
        })
    }

    /// Residuals beyond this distance from the mean are outliers.
    pub fn discard_limit(&self, multiplier: f64) -> f64 {
        self.mean.abs() + multiplier * self.std_dev
    }

    pub fn is_outlier(&self, residual: f64, multiplier: f64) -> bool {
        (residual - self.mean).abs() > self.discard_limit(multiplier)
    }
}
