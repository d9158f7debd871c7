//! Error types for the compile crate.
//!
//! Discretization errors carry the computed numeric values that triggered
//! them; by the time they fire, every symbol has been forced to a number
//! and the offending values are the only useful debugging handle.

use hrimfaxi_ir::{FieldChannel, IrError};
use hrimfaxi_task::TaskError;
use thiserror::Error;

/// Errors that can occur while compiling a program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Underlying IR error (unbound variable, empty register, ...).
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Underlying task-layer error.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Positional arguments not matching the flatten order.
    #[error("Expected {expected} positional arguments, got {got}")]
    ArgCountMismatch {
        /// Names declared by the flatten pragma.
        expected: usize,
        /// Arguments provided.
        got: usize,
    },

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

    /// Appended segments whose values do not meet.
    #[error(
        "Discontinuity of {jump} between segments: previous ends at {end_value}, next starts at {start_value}"
    )]
    Discontinuity {
        /// Terminal value of the earlier segment.
        end_value: f64,
        /// Initial value of the later segment.
        start_value: f64,
        /// Absolute difference.
        jump: f64,
    },

    /// Added waveforms whose durations disagree.
    #[error("Cannot add waveforms of durations {left} and {right}")]
    AddDurationMismatch {
        /// Duration of the left operand.
        left: f64,
        /// Duration of the right operand.
        right: f64,
    },

    /// A ramp where a piecewise-constant table is required.
    #[error("Piecewise-constant lowering found a ramp from {start} to {stop}")]
    NonConstantRamp {
        /// Ramp start value.
        start: f64,
        /// Ramp stop value.
        stop: f64,
    },

    /// Polynomial degree the hardware cannot express.
    #[error("Polynomial of degree {degree} is unsupported for hardware lowering")]
    UnsupportedPolynomial {
        /// The offending degree.
        degree: usize,
    },

    /// Slice window outside the sliced waveform.
    #[error("Slice [{start}, {stop}] is outside the waveform duration {duration}")]
    SliceOutOfBounds {
        /// Window start.
        start: f64,
        /// Window stop.
        stop: f64,
        /// Duration of the sliced waveform.
        duration: f64,
    },

    /// A field shape the channel cannot drive.
    #[error("Unsupported composition on {channel}: {reason}")]
    UnsupportedComposition {
        /// The offending channel.
        channel: FieldChannel,
        /// What was found.
        reason: String,
    },

    /// A run-time vector variable bound to a single number.
    #[error("Variable '{0}' must be bound to a per-site vector")]
    VectorExpected(String),

    /// A run-time vector of the wrong length.
    #[error("Vector '{name}' has {got} weights, the register has {expected} sites")]
    VectorLengthMismatch {
        /// The offending variable.
        name: String,
        /// Sites in the register.
        expected: usize,
        /// Weights provided.
        got: usize,
    },

    /// A site index outside the register.
    #[error("Location {index} is outside the register of {n_sites} sites")]
    LocationOutOfRange {
        /// The offending site index.
        index: usize,
        /// Sites in the register.
        n_sites: usize,
    },

    /// Parallelization requested without device bounds.
    #[error("Cannot expand a parallel register without device bounds")]
    MissingDeviceBounds,

    /// The coupling cannot be lowered for this hardware target.
    #[error("Hardware lowering does not support the {0} coupling")]
    UnsupportedCoupling(hrimfaxi_ir::LevelCoupling),

    /// A sequence with no lowerable pulse.
    #[error("Sequence has no pulse to lower")]
    EmptySequence,

    /// A pulse with no fields.
    #[error("Pulse has no fields")]
    EmptyPulse,
}

/// Result type for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
