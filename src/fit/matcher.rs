//! Line matching between the uncalibrated and standard lists.
//!
//! Both lists are walked once with two cursors (O(n + m)). When the current
//! pair lies within the tolerance it is recorded and both cursors advance;
//! otherwise the cursor on the smaller wavenumber advances, since that line
//! has no partner.
//!
//! This is a greedy forward match, not a minimum-cost assignment: with a
//! tolerance wider than half the standard line spacing a measured line can be
//! paired with the wrong neighbour. The behaviour is kept as-is so results
//! stay comparable with earlier calibrations.

use tracing::debug;

use crate::domain::{Line, LinePair};
use crate::error::CalibrationError;

/// Pair lines of `list` and `standard` whose wavenumbers differ by less than `tolerance`.
///
/// Both slices must be sorted ascending by wavenumber.
pub fn match_lines(
    list: &[Line],
    standard: &[Line],
    tolerance: f64,
) -> Result<Vec<LinePair>, CalibrationError> {
    if list.is_empty() || standard.is_empty() {
        return Err(CalibrationError::NoData);
    }

    let mut pairs = Vec::with_capacity(list.len().min(standard.len()));
    let mut li = 0usize;
    let mut si = 0usize;

    while li < list.len() && si < standard.len() {
        let measured = &list[li];
        let reference = &standard[si];
        let difference = reference.wavenumber() - measured.wavenumber();

        if difference.abs() < tolerance {
            debug!(
                index = measured.index(),
                wavenumber = measured.wavenumber(),
                peak = measured.peak(),
                standard = reference.wavenumber(),
                "common line"
            );
            pairs.push(LinePair {
                list: li,
                standard: si,
            });
            li += 1;
            si += 1;
        } else if reference.wavenumber() < measured.wavenumber() {
            debug!(
                index = reference.index(),
                wavenumber = reference.wavenumber(),
                "reference line is absent from the experiment"
            );
            si += 1;
        } else {
            debug!(
                index = measured.index(),
                wavenumber = measured.wavenumber(),
                "experiment line is absent from the standard"
            );
            li += 1;
        }
    }

    if pairs.is_empty() {
        return Err(CalibrationError::NoOverlap);
    }
    Ok(pairs)
}
