//! Terminal formatting of a calibration report.
//!
//! Formatting stays here so the fitting code never builds strings and output
//! changes are localized.

use crate::report::{CalibrationReport, LineErrorEstimate, LineRole};

/// Format the run summary: inputs, correction, residual statistics and passes.
pub fn format_calibration_summary(report: &CalibrationReport) -> String {
    let mut out = String::new();

    out.push_str("=== wavecal - wavenumber calibration ===\n");
    out.push_str(&format!("List    : {}\n", report.list));
    out.push_str(&format!("Standard: {}\n", report.standard));
    out.push_str(&format!(
        "Params  : tolerance={} cm-1 | threshold={} | discard={} sigma | spacing={} cm-1\n",
        report.params.tolerance,
        report.params.amplitude_threshold,
        report.params.discard_multiplier,
        report.params.point_spacing,
    ));
    out.push_str(&format!(
        "Lines   : matched={} | fitted={} | discarded={}\n",
        report.matched, report.fitted, report.discarded
    ));

    out.push_str("\nCorrection:\n");
    out.push_str(&format!(
        "- factor       : {:.6e} +/- {:.6e}\n",
        report.epsilon, report.uncertainty
    ));
    out.push_str(&format!(
        "- total (list) : {:.6e}\n",
        report.wavenumber_correction
    ));
    if let Some(fit) = &report.fit {
        out.push_str(&format!(
            "- chi2/dof     : {:.4} (dof={}, evaluations={}{})\n",
            fit.reduced_chi_squared,
            fit.dof,
            fit.evaluations,
            if fit.converged { "" } else { ", not converged" }
        ));
    }
    out.push_str(&format!(
        "- residuals    : mean={:.4e} sd={:.4e} se={:.4e}\n",
        report.residuals.mean, report.residuals.std_dev, report.residuals.std_err
    ));

    if !report.history.is_empty() {
        out.push_str("\nRejection passes:\n");
        for p in &report.history {
            out.push_str(&format!(
                "  {:>3}: fitted={:<5} removed={:<5} eps={:.6e} sd={:.4e}\n",
                p.pass,
                p.lines_fitted,
                p.lines_removed,
                p.epsilon,
                p.std_dev / crate::domain::DATA_SCALE
            ));
        }
    }

    let discarded: Vec<&LineErrorEstimate> = report.discarded_lines().collect();
    if !discarded.is_empty() {
        out.push_str("\nDiscarded lines:\n");
        out.push_str(&format_table(&discarded));
    }

    out
}

/// Format the per-line error table for the given lines.
pub fn format_line_errors(report: &CalibrationReport, role: Option<LineRole>) -> String {
    let rows: Vec<&LineErrorEstimate> = report
        .lines
        .iter()
        .filter(|l| role.is_none_or(|r| l.role == r))
        .collect();
    format_table(&rows)
}

fn format_table(rows: &[&LineErrorEstimate]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>6} {:>14} {:>9} {:>12} {:>11} {:<10}",
            "index", "wavenumber", "peak", "residual", "error", "role"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:->6} {:->14} {:->9} {:->12} {:->11} {:-<10}",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:>6} {:>14.6} {:>9.1} {:>12} {:>11.3e} {:<10}",
                r.index,
                r.wavenumber,
                r.peak,
                r.residual.map(|v| format!("{v:.3e}")).unwrap_or_else(|| "-".to_string()),
                r.combined_error,
                role_label(r.role),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn role_label(role: LineRole) -> &'static str {
    match role {
        LineRole::Fitted => "fitted",
        LineRole::Discarded => "discarded",
        LineRole::Weak => "weak",
        LineRole::Unmatched => "unmatched",
    }
}
