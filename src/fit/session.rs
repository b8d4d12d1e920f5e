//! Calibration session: the state shared by matching, selection, fitting and
//! outlier rejection.
//!
//! A session owns both line lists. Pairs are stored as indices into them and
//! the fitted / discarded sets as indices into the pair list, so nothing
//! borrows across the session boundary. Sessions are fully independent and
//! hold no global state.

use tracing::info;

use crate::domain::{CalibrationParams, DATA_SCALE, LineList, LinePair};
use crate::error::CalibrationError;
use crate::fit::fitter::{FitReport, ScalePoint, SolverOptions, fit_scale};
use crate::fit::matcher::match_lines;
use crate::fit::rejection::{RejectionPass, RejectionState, discard_outliers};
use crate::fit::selection::select_fitted;
use crate::math::ResidualStats;
use crate::models::normalized_residual;

#[derive(Debug, Clone)]
pub struct CalibrationSession {
    list: LineList,
    standard: LineList,
    params: CalibrationParams,
    solver: SolverOptions,
    pairs: Vec<LinePair>,
    fitted: Vec<usize>,
    discarded: Vec<usize>,
    epsilon: f64,
    uncertainty: f64,
    stats: ResidualStats,
    last_fit: Option<FitReport>,
    history: Vec<RejectionPass>,
}

impl CalibrationSession {
    /// Create a session. Parameters are validated before anything else happens.
    pub fn new(
        list: LineList,
        standard: LineList,
        params: CalibrationParams,
    ) -> Result<Self, CalibrationError> {
        params.validate()?;
        Ok(Self {
            list,
            standard,
            params,
            solver: SolverOptions::default(),
            pairs: Vec::new(),
            fitted: Vec::new(),
            discarded: Vec::new(),
            epsilon: 0.0,
            uncertainty: 0.0,
            stats: ResidualStats::default(),
            last_fit: None,
            history: Vec::new(),
        })
    }

    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    /// Starting estimate for the first fit.
    pub fn with_initial_correction(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Match, select, then fit and reject until no outliers remain.
    pub fn run(&mut self) -> Result<(), CalibrationError> {
        self.find_common_lines()?;
        self.find_fitted_lines()?;
        self.reject_outliers()
    }

    /// Pair the two lists. Resets any previous selection.
    pub fn find_common_lines(&mut self) -> Result<usize, CalibrationError> {
        let pairs = match_lines(self.list.lines(), self.standard.lines(), self.params.tolerance)?;
        info!(
            common = pairs.len(),
            list = self.list.len(),
            standard = self.standard.len(),
            "lines common to both lists"
        );
        self.pairs = pairs;
        self.fitted.clear();
        self.discarded.clear();
        self.history.clear();
        Ok(self.pairs.len())
    }

    /// Select the common lines strong enough to be fitted.
    pub fn find_fitted_lines(&mut self) -> Result<usize, CalibrationError> {
        let selected = select_fitted(&self.pairs, self.list.lines(), self.params.amplitude_threshold)?;
        info!(
            fitted = selected.len(),
            threshold = self.params.amplitude_threshold,
            "common lines at or above the amplitude threshold"
        );
        self.fitted = selected;
        self.discarded.clear();
        Ok(self.fitted.len())
    }

    /// Fit the correction to the current fitted set and refresh the statistics.
    ///
    /// On error the session is left as it was.
    pub fn find_correction(&mut self) -> Result<FitReport, CalibrationError> {
        let points: Vec<ScalePoint> = self.fitted.iter().map(|&i| self.scale_point(i)).collect();
        let fit = fit_scale(&points, self.epsilon, &self.solver)?;

        self.epsilon = fit.epsilon;
        self.uncertainty = fit.uncertainty;
        self.last_fit = Some(fit);
        self.calc_residual_stats();
        info!(
            mean = self.stats.mean / DATA_SCALE,
            std_dev = self.stats.std_dev / DATA_SCALE,
            std_err = self.stats.std_err / DATA_SCALE,
            "dσ/σ residuals"
        );
        Ok(fit)
    }

    /// Recompute mean / σ / standard error of the fitted residuals at the current ε.
    pub fn calc_residual_stats(&mut self) {
        let residuals: Vec<f64> = self.fitted.iter().map(|&i| self.residual(i)).collect();
        self.stats = ResidualStats::from_residuals(&residuals).unwrap_or_default();
    }

    /// One rejection pass. Returns the number of lines discarded.
    pub fn remove_bad_lines(&mut self) -> usize {
        let stats = self.stats;
        let epsilon = self.epsilon;
        let (list, standard, pairs) = (&self.list, &self.standard, &self.pairs);
        let residual = |i: usize| {
            let pair = pairs[i];
            normalized_residual(
                list.lines()[pair.list].wavenumber(),
                standard.lines()[pair.standard].wavenumber(),
                epsilon,
            )
        };

        let removed = discard_outliers(
            &mut self.fitted,
            &mut self.discarded,
            &stats,
            self.params.discard_multiplier,
            residual,
        );
        for d in &removed {
            let line = &self.list.lines()[self.pairs[d.pair].list];
            info!(
                index = line.index(),
                wavenumber = line.wavenumber(),
                residual = d.residual / DATA_SCALE,
                limit = d.limit / DATA_SCALE,
                "removing line"
            );
        }
        removed.len()
    }

    /// Alternate fitting and rejection until a pass removes nothing.
    pub fn reject_outliers(&mut self) -> Result<(), CalibrationError> {
        let mut state = RejectionState::Fitting;
        let mut pass = 0usize;
        self.history.clear();

        loop {
            state = match state {
                RejectionState::Fitting | RejectionState::Refitting => {
                    self.find_correction()?;
                    RejectionState::Evaluating
                }
                RejectionState::Evaluating => {
                    pass += 1;
                    let lines_fitted = self.fitted.len();
                    let removed = self.remove_bad_lines();
                    let fit = self.last_fit;
                    self.history.push(RejectionPass {
                        pass,
                        lines_fitted,
                        lines_removed: removed,
                        epsilon: self.epsilon,
                        uncertainty: self.uncertainty,
                        std_dev: self.stats.std_dev,
                        evaluations: fit.map_or(0, |f| f.evaluations),
                        solver_converged: fit.is_some_and(|f| f.converged),
                    });
                    if removed > 0 {
                        info!(removed, pass, "refining the calibration");
                        RejectionState::Refitting
                    } else {
                        info!(
                            multiplier = self.params.discard_multiplier,
                            "all lines within the discard limit"
                        );
                        RejectionState::Converged
                    }
                }
                RejectionState::Converged => return Ok(()),
            };
        }
    }

    /// Current normalized residual of pair `i` (`DATA_SCALE` units).
    pub fn residual(&self, i: usize) -> f64 {
        let p = self.scale_point(i);
        normalized_residual(p.measured, p.standard, self.epsilon)
    }

    fn scale_point(&self, i: usize) -> ScalePoint {
        let pair = self.pairs[i];
        let measured = &self.list.lines()[pair.list];
        ScalePoint {
            index: measured.index(),
            measured: measured.wavenumber(),
            standard: self.standard.lines()[pair.standard].wavenumber(),
        }
    }

    /// The uncalibrated list with the fitted correction composed onto every line.
    pub fn calibrated_list(&self) -> LineList {
        self.list.calibrated(self.epsilon)
    }

    pub fn list(&self) -> &LineList {
        &self.list
    }

    pub fn standard(&self) -> &LineList {
        &self.standard
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn pairs(&self) -> &[LinePair] {
        &self.pairs
    }

    /// Indices into `pairs()` of the lines currently fitted.
    pub fn fitted(&self) -> &[usize] {
        &self.fitted
    }

    /// Indices into `pairs()` of the lines rejected as outliers.
    pub fn discarded(&self) -> &[usize] {
        &self.discarded
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    /// Residual statistics in `DATA_SCALE` units.
    pub fn stats(&self) -> ResidualStats {
        self.stats
    }

    pub fn last_fit(&self) -> Option<&FitReport> {
        self.last_fit.as_ref()
    }

    pub fn history(&self) -> &[RejectionPass] {
        &self.history
    }
}
