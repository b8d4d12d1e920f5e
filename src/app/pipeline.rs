//! Shared calibration workflow:
//! load -> match -> select -> fit/reject -> error propagation -> report
//!
//! Front-ends only deal with presentation and where results are written.

use std::path::Path;

use tracing::info;

use crate::domain::{CalibrateConfig, LineList};
use crate::error::AppError;
use crate::fit::CalibrationSession;
use crate::io::{LineListLoader, OutputPaths, write_line_list_csv, write_report_json};
use crate::report::CalibrationReport;

/// All computed outputs of one `wavecal calibrate` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub session: CalibrationSession,
    pub calibrated: LineList,
    pub report: CalibrationReport,
}

/// Load both lists and run the calibration.
pub fn run_calibration<L: LineListLoader>(loader: &L, config: &CalibrateConfig) -> Result<RunOutput, AppError> {
    // Reject bad parameters before touching the file system.
    config.params.validate()?;

    let list = loader.load_uncalibrated(&config.list_path)?;
    let standard = loader.load_standard(&config.standard_path)?;
    info!(
        list = list.name(),
        lines = list.len(),
        standard = standard.name(),
        standard_lines = standard.len(),
        "loaded line lists"
    );

    calibrate_lists(list, standard, config)
}

/// Run the calibration on lists that are already in memory.
pub fn calibrate_lists(list: LineList, standard: LineList, config: &CalibrateConfig) -> Result<RunOutput, AppError> {
    let mut session = CalibrationSession::new(list, standard, config.params)?;
    session.run()?;

    let calibrated = session.calibrated_list();
    let report = CalibrationReport::from_session(&session);

    Ok(RunOutput {
        session,
        calibrated,
        report,
    })
}

/// Write the calibrated list and the JSON report next to `stem`.
pub fn write_outputs(run: &RunOutput, stem: &Path) -> Result<OutputPaths, AppError> {
    let paths = OutputPaths::from_stem(stem);
    write_line_list_csv(&paths.list, &run.calibrated)?;
    write_report_json(&paths.report, &run.report)?;
    Ok(paths)
}
