//! Shared domain types.
//!
//! These are kept as plain data so they can be:
//!
//! - produced by any loader (the CSV one in `io::ingest` is just one option)
//! - consumed by the calibration session without copying
//! - exported by the writer without formatting logic leaking in here

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, LineError};

/// Multiplier applied to normalized residuals (`dσ/σ`) for readability.
///
/// Residual statistics are held in these units; everything reported to the
/// user is divided back out.
pub const DATA_SCALE: f64 = 1.0e6;

/// Default line-matching tolerance (cm^-1).
pub const DEFAULT_TOLERANCE: f64 = 0.1;
/// Default minimum peak amplitude (equivalent to S/N for normalised spectra).
pub const DEFAULT_AMPLITUDE_THRESHOLD: f64 = 50.0;
/// Default discard limit, in residual standard deviations.
pub const DEFAULT_DISCARD_MULTIPLIER: f64 = 2.0;
/// Default spacing between spectrum data points (cm^-1).
pub const DEFAULT_POINT_SPACING: f64 = 0.03;

/// Header-level corrections shared by every line of one loaded list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderCorrections {
    pub wavenumber: f64,
    pub air: f64,
    pub intensity: f64,
}

/// Line properties as read from a source, before correction handling.
///
/// `wavenumber` and `width` are taken to already include the list's
/// wavenumber correction, as they do in line lists written after a previous
/// calibration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineFields {
    pub index: i32,
    pub wavenumber: f64,
    pub peak: f64,
    pub width: f64,
    pub damping: f64,
    pub eqwidth: f64,
    pub itn: i32,
    pub hold: i32,
    pub tags: String,
    pub id: String,
    pub eps_total: f64,
    pub eps_even: f64,
    pub eps_odd: f64,
    pub eps_random: f64,
}

/// One spectral line.
///
/// Wavenumber and width are stored uncorrected. The getters apply
/// `(1 + wavenumber correction)` at read time, so the correction can be
/// replaced without re-reading the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    index: i32,
    raw_wavenumber: f64,
    peak: f64,
    raw_width: f64,
    damping: f64,
    eqwidth: f64,
    itn: i32,
    hold: i32,
    tags: String,
    id: String,
    eps_total: f64,
    eps_even: f64,
    eps_odd: f64,
    eps_random: f64,
    corrections: HeaderCorrections,
    source: String,
}

impl Line {
    /// Build a line, un-applying `corrections.wavenumber` from the input values.
    pub fn new(
        fields: LineFields,
        corrections: HeaderCorrections,
        source: impl Into<String>,
    ) -> Result<Self, LineError> {
        check_non_negative("wavenumber", fields.wavenumber)?;
        check_non_negative("peak", fields.peak)?;
        check_non_negative("width", fields.width)?;
        check_non_negative("eqwidth", fields.eqwidth)?;
        if !(corrections.wavenumber.is_finite() && corrections.wavenumber > -1.0) {
            return Err(LineError::InvalidCorrection {
                value: corrections.wavenumber,
            });
        }

        let factor = 1.0 + corrections.wavenumber;
        Ok(Self {
            index: fields.index,
            raw_wavenumber: fields.wavenumber / factor,
            peak: fields.peak,
            raw_width: fields.width / factor,
            damping: fields.damping,
            eqwidth: fields.eqwidth,
            itn: fields.itn,
            hold: fields.hold,
            tags: fields.tags,
            id: fields.id,
            eps_total: fields.eps_total,
            eps_even: fields.eps_even,
            eps_odd: fields.eps_odd,
            eps_random: fields.eps_random,
            corrections,
            source: source.into(),
        })
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    /// Corrected wavenumber (cm^-1).
    pub fn wavenumber(&self) -> f64 {
        self.raw_wavenumber * (1.0 + self.corrections.wavenumber)
    }

    pub fn raw_wavenumber(&self) -> f64 {
        self.raw_wavenumber
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Corrected line width (mK).
    pub fn width(&self) -> f64 {
        self.raw_width * (1.0 + self.corrections.wavenumber)
    }

    pub fn raw_width(&self) -> f64 {
        self.raw_width
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn eqwidth(&self) -> f64 {
        self.eqwidth
    }

    pub fn itn(&self) -> i32 {
        self.itn
    }

    pub fn hold(&self) -> i32 {
        self.hold
    }

    pub fn tags(&self) -> &str {
        &self.tags
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn eps_total(&self) -> f64 {
        self.eps_total
    }

    pub fn eps_even(&self) -> f64 {
        self.eps_even
    }

    pub fn eps_odd(&self) -> f64 {
        self.eps_odd
    }

    pub fn eps_random(&self) -> f64 {
        self.eps_random
    }

    /// Vacuum wavelength in nm, derived from the corrected wavenumber.
    pub fn wavelength(&self) -> f64 {
        1.0e7 / self.wavenumber()
    }

    pub fn wavenumber_correction(&self) -> f64 {
        self.corrections.wavenumber
    }

    pub fn air_correction(&self) -> f64 {
        self.corrections.air
    }

    pub fn intensity_calibration(&self) -> f64 {
        self.corrections.intensity
    }

    pub fn corrections(&self) -> HeaderCorrections {
        self.corrections
    }

    /// Name of the list this line was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_wavenumber_correction(&mut self, correction: f64) {
        self.corrections.wavenumber = correction;
    }

    /// Copy of this line with a further scale correction `epsilon` composed
    /// onto the existing one: `(1 + c') = (1 + c)(1 + epsilon)`.
    pub fn calibrated(&self, epsilon: f64) -> Line {
        let mut out = self.clone();
        out.corrections.wavenumber = (1.0 + self.corrections.wavenumber) * (1.0 + epsilon) - 1.0;
        out
    }

    /// Brault estimate of the error in locating the line centre (cm^-1).
    ///
    /// Width is in mK, hence the factors of 1000. Only meaningful when the
    /// peak amplitude is normalised to the noise level.
    pub fn centroid_error(&self, point_spacing: f64) -> f64 {
        let width = self.width();
        let points_in_fwhm = width / (1000.0 * point_spacing);
        width / (1000.0 * points_in_fwhm.sqrt() * self.peak)
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), LineError> {
    if value < 0.0 {
        return Err(LineError::Negative { field, value });
    }
    Ok(())
}

/// An ordered line list together with its header corrections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineList {
    name: String,
    corrections: HeaderCorrections,
    lines: Vec<Line>,
}

impl LineList {
    pub fn new(name: impl Into<String>, corrections: HeaderCorrections, lines: Vec<Line>) -> Self {
        Self {
            name: name.into(),
            corrections,
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn corrections(&self) -> HeaderCorrections {
        self.corrections
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy of the list with `epsilon` composed onto every line's correction.
    pub fn calibrated(&self, epsilon: f64) -> LineList {
        let lines: Vec<Line> = self.lines.iter().map(|l| l.calibrated(epsilon)).collect();
        let mut corrections = self.corrections;
        corrections.wavenumber = (1.0 + corrections.wavenumber) * (1.0 + epsilon) - 1.0;
        LineList {
            name: self.name.clone(),
            corrections,
            lines,
        }
    }
}

/// A matched pair of lines, as indices into the uncalibrated and standard lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePair {
    pub list: usize,
    pub standard: usize,
}

/// Tunable calibration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Maximum wavenumber difference (cm^-1) for two lines to be paired.
    pub tolerance: f64,
    /// Minimum peak amplitude of a measured line for it to be fitted.
    pub amplitude_threshold: f64,
    /// Lines further than this many standard deviations from the mean
    /// residual are discarded.
    pub discard_multiplier: f64,
    /// Spacing between spectrum data points (cm^-1).
    pub point_spacing: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            amplitude_threshold: DEFAULT_AMPLITUDE_THRESHOLD,
            discard_multiplier: DEFAULT_DISCARD_MULTIPLIER,
            point_spacing: DEFAULT_POINT_SPACING,
        }
    }
}

impl CalibrationParams {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (name, value) in [
            ("match tolerance", self.tolerance),
            ("amplitude threshold", self.amplitude_threshold),
            ("discard multiplier", self.discard_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CalibrationError::InvalidParameter { name, value });
            }
        }
        if !(self.point_spacing.is_finite() && self.point_spacing > 0.0) {
            return Err(CalibrationError::InvalidParameter {
                name: "point spacing",
                value: self.point_spacing,
            });
        }
        Ok(())
    }
}

/// Fully resolved settings for one `wavecal calibrate` run.
#[derive(Debug, Clone)]
pub struct CalibrateConfig {
    pub list_path: PathBuf,
    pub standard_path: PathBuf,
    /// Output stem; `.cal.csv` and `.cal.json` are appended.
    pub output: PathBuf,
    pub params: CalibrationParams,
    /// Skip writing output files (summary only).
    pub dry_run: bool,
}
