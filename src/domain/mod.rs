//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - spectral lines and line lists (`Line`, `LineList`, `HeaderCorrections`)
//! - matched line pairs (`LinePair`)
//! - calibration parameters and run configuration

pub mod types;

pub use types::*;
