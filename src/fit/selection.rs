//! Selection of the common lines that take part in the fit.
//!
//! Weak lines locate their centres poorly and would only add scatter, so only
//! pairs whose measured peak amplitude reaches the threshold are fitted.

use tracing::debug;

use crate::domain::{Line, LinePair};
use crate::error::CalibrationError;

/// Indices into `pairs` of the pairs whose measured line has `peak >= threshold`.
///
/// Order is preserved. An empty result is not an error here; the fitter
/// rejects it as a degenerate fit.
pub fn select_fitted(
    pairs: &[LinePair],
    list: &[Line],
    threshold: f64,
) -> Result<Vec<usize>, CalibrationError> {
    if pairs.is_empty() {
        return Err(CalibrationError::NoData);
    }

    let selected: Vec<usize> = pairs
        .iter()
        .enumerate()
        .filter(|(_, pair)| list[pair.list].peak() >= threshold)
        .map(|(i, _)| i)
        .collect();

    for &i in &selected {
        let line = &list[pairs[i].list];
        debug!(
            index = line.index(),
            wavenumber = line.wavenumber(),
            peak = line.peak(),
            "selected for fitting"
        );
    }
    debug!(
        selected = selected.len(),
        common = pairs.len(),
        threshold,
        "amplitude selection"
    );

    Ok(selected)
}
