//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A scalar expression referenced a variable with no binding.
    #[error("Variable '{0}' is unbound")]
    UnboundVariable(String),

    /// A variable bound to a per-site vector was used where a single
    /// number is required.
    #[error("Variable '{0}' is bound to a per-site vector, expected a scalar value")]
    NonScalarVariable(String),

    /// Division by zero while evaluating a scalar expression.
    #[error("Division by zero while evaluating '{0}'")]
    DivisionByZero(String),

    /// Slice interval with stop before start.
    #[error("Slice stop {stop} precedes start {start}")]
    InvalidInterval {
        /// Start of the offending interval.
        start: String,
        /// Stop of the offending interval.
        stop: String,
    },

    /// Resampling grid step must be positive.
    #[error("Sample step must be positive, got {0}")]
    NonPositiveSampleStep(f64),

    /// Operation requires a non-empty register.
    #[error("Register is empty")]
    EmptyRegister,
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
