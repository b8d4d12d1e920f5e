//! Calibration results: per-line error propagation and the report record
//! handed to the writer.
//!
//! Formatting for the terminal lives in `format` so the numbers here stay
//! plain data (and serialisable as-is).

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{CalibrationParams, DATA_SCALE, Line};
use crate::fit::{CalibrationSession, FitReport, RejectionPass};

pub mod format;

pub use format::*;

/// How a line of the uncalibrated list took part in the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    /// Matched, above the amplitude threshold, kept in the final fit.
    Fitted,
    /// Fitted at first, then rejected as an outlier.
    Discarded,
    /// Matched to a standard line but below the amplitude threshold.
    Weak,
    /// No standard line within tolerance.
    Unmatched,
}

/// Propagated uncertainty of one calibrated line (all errors in cm^-1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineErrorEstimate {
    pub index: i32,
    /// Calibrated wavenumber (cm^-1).
    pub wavenumber: f64,
    pub peak: f64,
    pub width: f64,
    pub role: LineRole,
    /// Residual against the matched standard line (`dσ/σ`), if matched.
    pub residual: Option<f64>,
    pub scale_error: f64,
    pub statistical_error: f64,
    /// Centroid error, undefined for lines without a positive peak and width.
    pub brault_error: Option<f64>,
    pub combined_error: f64,
}

/// Error budget for one calibrated line.
///
/// `std_dev` is the residual standard deviation in `DATA_SCALE` units. The
/// combined error is the larger of the scale error added in quadrature to
/// either the statistical or the centroid (Brault) error, so it is never
/// smaller than any one of them. Without a centroid error only the
/// statistical term is used.
pub fn propagate_line_error(
    line: &Line,
    uncertainty: f64,
    std_dev: f64,
    point_spacing: f64,
) -> LineErrorEstimate {
    let wavenumber = line.wavenumber();
    let scale_error = wavenumber * uncertainty;
    let statistical_error = wavenumber * std_dev / DATA_SCALE;
    let brault_error = (line.peak() > 0.0 && line.width() > 0.0).then(|| line.centroid_error(point_spacing));

    let with_stat = scale_error.hypot(statistical_error);
    let with_brault = brault_error.map_or(0.0, |b| scale_error.hypot(b));

    LineErrorEstimate {
        index: line.index(),
        wavenumber,
        peak: line.peak(),
        width: line.width(),
        role: LineRole::Unmatched,
        residual: None,
        scale_error,
        statistical_error,
        brault_error,
        combined_error: with_stat.max(with_brault),
    }
}

/// Error estimates for every line of the calibrated list, in list order.
pub fn propagate_errors(session: &CalibrationSession) -> Vec<LineErrorEstimate> {
    let calibrated = session.calibrated_list();
    let roles = line_roles(session);
    let uncertainty = session.uncertainty();
    let std_dev = session.stats().std_dev;
    let spacing = session.params().point_spacing;

    calibrated
        .lines()
        .par_iter()
        .zip(roles.par_iter())
        .map(|(line, &(role, residual))| {
            if line.peak() <= 0.0 || line.width() <= 0.0 {
                warn!(
                    index = line.index(),
                    peak = line.peak(),
                    width = line.width(),
                    "non-positive peak or width, centroid error is undefined"
                );
            }
            let mut estimate = propagate_line_error(line, uncertainty, std_dev, spacing);
            estimate.role = role;
            estimate.residual = residual;
            estimate
        })
        .collect()
}

/// Role and current residual (natural units) of each uncalibrated line.
fn line_roles(session: &CalibrationSession) -> Vec<(LineRole, Option<f64>)> {
    let mut roles = vec![(LineRole::Unmatched, None); session.list().len()];
    for (i, pair) in session.pairs().iter().enumerate() {
        roles[pair.list] = (LineRole::Weak, Some(session.residual(i) / DATA_SCALE));
    }
    for &i in session.fitted() {
        roles[session.pairs()[i].list].0 = LineRole::Fitted;
    }
    for &i in session.discarded() {
        roles[session.pairs()[i].list].0 = LineRole::Discarded;
    }
    roles
}

/// Residual statistics in natural (`dσ/σ`) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
}

/// Everything a writer needs to persist one calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub generated_at: DateTime<Utc>,
    pub list: String,
    pub standard: String,
    pub params: CalibrationParams,
    /// Correction found by this run.
    pub epsilon: f64,
    pub uncertainty: f64,
    /// Total correction of the calibrated list (composed with any previous one).
    pub wavenumber_correction: f64,
    pub residuals: ResidualSummary,
    pub matched: usize,
    pub fitted: usize,
    pub discarded: usize,
    pub fit: Option<FitReport>,
    pub history: Vec<RejectionPass>,
    pub lines: Vec<LineErrorEstimate>,
}

impl CalibrationReport {
    pub fn from_session(session: &CalibrationSession) -> Self {
        let stats = session.stats();
        Self {
            generated_at: Utc::now(),
            list: session.list().name().to_string(),
            standard: session.standard().name().to_string(),
            params: *session.params(),
            epsilon: session.epsilon(),
            uncertainty: session.uncertainty(),
            wavenumber_correction: session.calibrated_list().corrections().wavenumber,
            residuals: ResidualSummary {
                mean: stats.mean / DATA_SCALE,
                std_dev: stats.std_dev / DATA_SCALE,
                std_err: stats.std_err / DATA_SCALE,
            },
            matched: session.pairs().len(),
            fitted: session.fitted().len(),
            discarded: session.discarded().len(),
            fit: session.last_fit().copied(),
            history: session.history().to_vec(),
            lines: propagate_errors(session),
        }
    }

    /// Estimates for the lines rejected as outliers.
    pub fn discarded_lines(&self) -> impl Iterator<Item = &LineErrorEstimate> {
        self.lines.iter().filter(|l| l.role == LineRole::Discarded)
    }
}
