//! Mathematical utilities: least squares and residual statistics.

pub mod lsq;
pub mod stats;

pub use lsq::*;
pub use stats::*;
