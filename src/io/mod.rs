//! Input/output helpers.
//!
//! - line list loading (`ingest`)
//! - calibrated list and report writers (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
