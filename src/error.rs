//! Error types.
//!
//! Two layers:
//!
//! - [`ReflError`]: the library taxonomy. Every fallible operation in the
//!   simulation / fit / Fisher pipeline returns one of these.
//! - [`AppError`]: the process boundary. Carries an exit code and a message for
//!   `rfi`; built from a `ReflError` (or directly, for CLI-level problems).
//!
//! Exit codes:
//! - `2` invalid input or configuration
//! - `3` reference data unavailable
//! - `4` computational failure (fit, sensitivity, reflectance guard)

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the simulation and uncertainty pipeline.
#[derive(Debug, Clone, Error)]
pub enum ReflError {
    #[error("Flux profile unavailable at '{}': {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("Degenerate sensitivity for parameter '{parameter}': Fisher diagonal is {diagonal:e}")]
    DegenerateSensitivity { parameter: String, diagonal: f64 },

    #[error(
        "Non-positive measured flux at point {index} (Q={q:.5}): reflectance={reflectance:e}, flux={flux:e}"
    )]
    NonPositiveReflectance {
        index: usize,
        q: f64,
        reflectance: f64,
        flux: f64,
    },

    #[error("Optimizer did not converge after {iterations} iterations (chi2={chi2:e}): {reason}")]
    OptimizerDidNotConverge {
        iterations: usize,
        chi2: f64,
        reason: String,
    },

    #[error("Parameter '{parameter}' value {value} is outside bounds [{lower}, {upper}]")]
    OutOfBounds {
        parameter: String,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Parameter '{parameter}' is already free to vary; bounds may only be initialized once")]
    AlreadyVarying { parameter: String },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReflError {
    /// Process exit code used when this error ends a CLI run.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReflError::InvalidInput(_)
            | ReflError::OutOfBounds { .. }
            | ReflError::AlreadyVarying { .. } => 2,
            ReflError::DataUnavailable { .. } => 3,
            ReflError::DegenerateSensitivity { .. }
            | ReflError::NonPositiveReflectance { .. }
            | ReflError::OptimizerDidNotConverge { .. }
            | ReflError::DimensionMismatch(_) => 4,
        }
    }
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

impl From<ReflError> for AppError {
    fn from(err: ReflError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refl_error_maps_to_exit_codes() {
        let missing = ReflError::DataUnavailable {
            path: PathBuf::from("nope.dat"),
            reason: "not found".to_string(),
        };
        let app: AppError = missing.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("nope.dat"));

        let app: AppError = ReflError::InvalidInput("bad".to_string()).into();
        assert_eq!(app.exit_code(), 2);

        let app: AppError = ReflError::OptimizerDidNotConverge {
            iterations: 10,
            chi2: 1.0,
            reason: "budget".to_string(),
        }
        .into();
        assert_eq!(app.exit_code(), 4);
    }
}
