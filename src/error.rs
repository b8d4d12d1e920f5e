//! Error types.
//!
//! The library surfaces typed errors per concern (`LineError`, `LoadError`,
//! `CalibrationError`). The binary folds all of them into `AppError`, which
//! only carries a message and a process exit code:
//!
//! - 2: invalid configuration / usage
//! - 3: unreadable or malformed input
//! - 4: calibration failure (no overlap, degenerate fit, ...)
//! - 5: output could not be written

use std::path::PathBuf;

use thiserror::Error;

/// Invalid value supplied while constructing a `Line`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("line {field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("wavenumber correction must be finite and greater than -1, got {value}")]
    InvalidCorrection { value: f64 },
}

/// Failure to load a line list from its source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed header in '{}': {reason}", path.display())]
    MalformedHeader { path: PathBuf, reason: String },
    #[error("malformed record at line {line} of '{}': {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Failure of a calibration session operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("invalid {name}: {value} (must be finite and non-negative)")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("no data: a line list or the set of common lines is empty")]
    NoData,
    #[error("no overlap between the uncalibrated and standard line lists")]
    NoOverlap,
    #[error("degenerate fit: {fitted} line(s) left to fit, at least {required} required")]
    DegenerateFit { fitted: usize, required: usize },
    #[error("non-finite residual for line {index}; check the standard wavenumbers")]
    NonFiniteResidual { index: i32 },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(3, format!("Error: {err}"))
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        let code = match err {
            CalibrationError::InvalidParameter { .. } => 2,
            _ => 4,
        };
        AppError::new(code, format!("Error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_errors_map_to_exit_codes() {
        let cfg: AppError = CalibrationError::InvalidParameter {
            name: "discard multiplier",
            value: -1.0,
        }
        .into();
        assert_eq!(cfg.exit_code(), 2);

        let fit: AppError = CalibrationError::DegenerateFit {
            fitted: 1,
            required: 2,
        }
        .into();
        assert_eq!(fit.exit_code(), 4);
        assert!(fit.to_string().contains("degenerate fit"));
    }

    #[test]
    fn load_errors_report_line_numbers() {
        let err = LoadError::MalformedRecord {
            path: PathBuf::from("lines.csv"),
            line: 7,
            reason: "bad wavenumber".to_string(),
        };
        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("line 7"));
    }
}
