//! `wavecal` library crate.
//!
//! The binary (`wavecal`) is a thin wrapper around this library so that:
//!
//! - the calibration is testable without spawning processes
//! - other front-ends can supply their own `LineListLoader`
//! - numerical code stays apart from I/O and presentation

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
