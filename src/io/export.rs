//! Writers for calibration results.
//!
//! - `<stem>.cal.csv`: the calibrated line list, readable by `CsvLineLoader`
//! - `<stem>.cal.json`: the full `CalibrationReport`

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::LineList;
use crate::error::AppError;
use crate::report::CalibrationReport;

/// Paths written for an output stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub list: PathBuf,
    pub report: PathBuf,
}

impl OutputPaths {
    pub fn from_stem(stem: &Path) -> Self {
        Self {
            list: with_suffix(stem, ".cal.csv"),
            report: with_suffix(stem, ".cal.json"),
        }
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut s = stem.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Write the calibrated list in the loader's CSV format.
///
/// Values are written corrected, with the composed correction in the header,
/// so the file can be loaded again (and recalibrated) without loss.
pub fn write_line_list_csv(path: &Path, list: &LineList) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(5, format!("Failed to create line list '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    let err = |e: &dyn std::fmt::Display| AppError::new(5, format!("Failed to write line list '{}': {e}", path.display()));

    let c = list.corrections();
    writeln!(out, "# calibrated from {}", list.name()).map_err(|e| err(&e))?;
    writeln!(out, "# wavenumber_correction = {:e}", c.wavenumber).map_err(|e| err(&e))?;
    writeln!(out, "# air_correction = {:e}", c.air).map_err(|e| err(&e))?;
    writeln!(out, "# intensity_calibration = {:e}", c.intensity).map_err(|e| err(&e))?;

    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(LINE_LIST_COLUMNS).map_err(|e| err(&e))?;
    for l in list.lines() {
        writer
            .write_record([
                l.index().to_string(),
                format!("{:.6}", l.wavenumber()),
                format!("{:.7}", l.wavelength()),
                l.peak().to_string(),
                format!("{:.3}", l.width()),
                l.damping().to_string(),
                l.eqwidth().to_string(),
                l.itn().to_string(),
                l.hold().to_string(),
                l.tags().to_string(),
                l.eps_total().to_string(),
                l.eps_even().to_string(),
                l.eps_odd().to_string(),
                l.eps_random().to_string(),
                l.id().to_string(),
            ])
            .map_err(|e| err(&e))?;
    }

    writer.flush().map_err(|e| err(&e))
}

const LINE_LIST_COLUMNS: [&str; 15] = [
    "index",
    "wavenumber",
    "wavelength",
    "peak",
    "width",
    "damping",
    "eqwidth",
    "itn",
    "hold",
    "tags",
    "eps_total",
    "eps_even",
    "eps_odd",
    "eps_random",
    "id",
];

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &CalibrationReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(5, format!("Failed to create report '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .map_err(|e| AppError::new(5, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

/// Read a report written by `write_report_json`.
pub fn read_report_json(path: &Path) -> Result<CalibrationReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(3, format!("Failed to open report '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(3, format!("Invalid report JSON: {e}")))
}
