//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the diagnostic subscriber
//! - runs the calibration pipeline
//! - prints the summary and writes the outputs

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CalibrateArgs, Cli, Command, ShowArgs};
use crate::error::AppError;
use crate::io::CsvLineLoader;

pub mod pipeline;

/// Entry point for the `wavecal` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Calibrate(args) => handle_calibrate(args),
        Command::Show(args) => handle_show(args),
    }
}

/// Diagnostics go to stderr so stdout carries only the summary.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_calibrate(args: CalibrateArgs) -> Result<(), AppError> {
    let config = args.to_config();
    let run = pipeline::run_calibration(&CsvLineLoader, &config)?;

    println!("{}", crate::report::format_calibration_summary(&run.report));
    if args.lines {
        println!("{}", crate::report::format_line_errors(&run.report, None));
    }

    if config.dry_run {
        return Ok(());
    }
    let paths = pipeline::write_outputs(&run, &config.output)?;
    println!("Wrote {}", paths.list.display());
    println!("Wrote {}", paths.report.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    println!("{}", crate::report::format_calibration_summary(&report));
    if args.lines {
        println!("{}", crate::report::format_line_errors(&report, None));
    }
    Ok(())
}
