//! Command-line parsing for the wavenumber calibrator.
//!
//! Argument parsing and command dispatch stay separate from the fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{
    CalibrateConfig, CalibrationParams, DEFAULT_AMPLITUDE_THRESHOLD, DEFAULT_DISCARD_MULTIPLIER,
    DEFAULT_POINT_SPACING, DEFAULT_TOLERANCE,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "wavecal", version, about = "Wavenumber calibration of spectral line lists")]
pub struct Cli {
    /// More diagnostics (-v: debug, -vv: trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calibrate a line list against a standard list and write the calibrated copy.
    Calibrate(CalibrateArgs),
    /// Print a report written by `wavecal calibrate`.
    Show(ShowArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CalibrateArgs {
    /// Uncalibrated line list (CSV).
    #[arg(value_name = "LIST")]
    pub list: PathBuf,

    /// Standard (reference) line list (CSV).
    #[arg(value_name = "STANDARD")]
    pub standard: PathBuf,

    /// Maximum wavenumber difference (cm^-1) for two lines to match.
    #[arg(short = 't', long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Minimum peak amplitude for a matched line to be fitted.
    #[arg(short = 'a', long = "threshold", default_value_t = DEFAULT_AMPLITUDE_THRESHOLD)]
    pub threshold: f64,

    /// Discard lines more than this many standard deviations from the mean residual.
    #[arg(short = 'd', long = "discard", default_value_t = DEFAULT_DISCARD_MULTIPLIER)]
    pub discard: f64,

    /// Spacing of the spectrum data points (cm^-1), for centroid errors.
    #[arg(short = 's', long = "spacing", default_value_t = DEFAULT_POINT_SPACING)]
    pub spacing: f64,

    /// Output stem; `.cal.csv` and `.cal.json` are appended. Defaults to LIST without its extension.
    #[arg(short, long, value_name = "STEM")]
    pub output: Option<PathBuf>,

    /// Print the summary without writing any files.
    #[arg(long = "no-write", visible_alias = "dry-run")]
    pub no_write: bool,

    /// Also print the per-line error table.
    #[arg(long)]
    pub lines: bool,
}

impl CalibrateArgs {
    pub fn to_config(&self) -> CalibrateConfig {
        CalibrateConfig {
            list_path: self.list.clone(),
            standard_path: self.standard.clone(),
            output: self
                .output
                .clone()
                .unwrap_or_else(|| self.list.with_extension("")),
            params: CalibrationParams {
                tolerance: self.tolerance,
                amplitude_threshold: self.threshold,
                discard_multiplier: self.discard,
                point_spacing: self.spacing,
            },
            dry_run: self.no_write,
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// Report JSON produced by `wavecal calibrate`.
    #[arg(value_name = "JSON")]
    pub report: PathBuf,

    /// Also print the per-line error table.
    #[arg(long)]
    pub lines: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrate_defaults() {
        let cli = Cli::parse_from(["wavecal", "calibrate", "fe.csv", "ar_std.csv"]);
        let Command::Calibrate(args) = cli.command else {
            panic!("expected calibrate");
        };
        let config = args.to_config();
        assert_eq!(config.params, CalibrationParams::default());
        assert_eq!(config.output, PathBuf::from("fe"));
        assert!(!config.dry_run);
    }

    #[test]
    fn calibrate_flags() {
        let cli = Cli::parse_from([
            "wavecal", "-v", "calibrate", "fe.csv", "std.csv", "--tolerance", "0.05", "--threshold", "20",
            "--discard", "2.5", "--spacing", "0.01", "-o", "out/run", "--dry-run",
        ]);
        assert_eq!(cli.verbose, 1);
        let Command::Calibrate(args) = cli.command else {
            panic!("expected calibrate");
        };
        let config = args.to_config();
        assert_eq!(config.params.tolerance, 0.05);
        assert_eq!(config.params.amplitude_threshold, 20.0);
        assert_eq!(config.params.discard_multiplier, 2.5);
        assert_eq!(config.params.point_spacing, 0.01);
        assert_eq!(config.output, PathBuf::from("out/run"));
        assert!(config.dry_run);
    }
}
