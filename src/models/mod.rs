//! Wavenumber scale-correction model.
//!
//! Kept as small, pure functions so the fitter and the statistics share one
//! definition of the residual.

pub mod model;

pub use model::*;
