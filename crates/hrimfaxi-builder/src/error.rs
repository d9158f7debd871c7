//! Error types for the builder crate.

use hrimfaxi_ir::IrError;
use thiserror::Error;

/// Errors that can occur building or parsing a program chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuilderError {
    /// Underlying IR error.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// The chain does not begin with a register node.
    #[error("Builder chain does not begin with a register")]
    MissingRegister,

    /// A node kind appeared where the grammar does not allow it.
    #[error("Unexpected {kind} node while reading {context}")]
    UnexpectedNode {
        /// The offending node kind.
        kind: &'static str,
        /// What the parser was reading.
        context: &'static str,
    },

    /// A site index addressed a site outside the register.
    #[error("Location {index} is outside the register of {n_sites} sites")]
    LocationOutOfRange {
        /// The offending site index.
        index: usize,
        /// Sites in the register.
        n_sites: usize,
    },

    /// A scale node appeared with no location to scale.
    #[error("Scale node has no preceding location")]
    ScaleWithoutLocation,

    /// A spatial modulation run was not followed by any waveform.
    #[error("Spatial modulation is not followed by a waveform")]
    EmptyWaveform,

    /// The same name was passed to flatten twice.
    #[error("Cannot flatten duplicate name '{0}'")]
    DuplicateFlattenName(String),

    /// Flatten named a variable bound as a run-time vector.
    #[error("Cannot flatten run-time vector '{0}'")]
    FlattenRunTimeVector(String),

    /// Batched variables with different row counts.
    #[error("Batch variable '{name}' has {got} values, expected {expected}")]
    BatchLengthMismatch {
        /// The offending variable.
        name: String,
        /// Row count of the first batched variable.
        expected: usize,
        /// Row count of the offending variable.
        got: usize,
    },
}

/// Result type for builder operations.
pub type BuilderResult<T> = Result<T, BuilderError>;
