//! Calibration orchestration.
//!
//! Responsibilities:
//!
//! - pair the uncalibrated list with the standard list
//! - pick the pairs strong enough to fit
//! - fit the scale correction, rejecting outliers until stable

pub mod fitter;
pub mod matcher;
pub mod rejection;
pub mod selection;
pub mod session;

pub use fitter::*;
pub use matcher::*;
pub use rejection::*;
pub use selection::*;
pub use session::*;
