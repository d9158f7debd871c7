//! Hrimfaxi Analog Program Intermediate Representation
//!
//! This crate provides the core data structures for representing analog
//! drive programs on neutral-atom arrays. It forms the foundation of the
//! entire Hrimfaxi compilation stack.
//!
//! # Overview
//!
//! A program pairs a geometric [`Register`] of trap sites with a
//! [`Sequence`] of time-dependent drives. Drives are organized as nested
//! maps: level coupling → [`Pulse`], field channel → [`Field`], spatial
//! modulation → [`Waveform`]. Every numeric quantity is a symbolic
//! [`Scalar`], so a program can be constructed once and bound to many
//! different parameter values.
//!
//! # Core Components
//!
//! - **Scalars**: [`Scalar`] expressions over named free variables,
//!   with substitution and literal folding
//! - **Waveforms**: [`Waveform`] time-functions with structural durations
//! - **Fields**: [`SpatialModulation`] + [`Waveform`] drives summed into a
//!   [`Field`]
//! - **Sequences**: [`Sequence`] / [`Pulse`] maps from couplings and
//!   channels to fields
//! - **Registers**: [`Register`] site lists and [`ParallelRegister`]
//!   tiling seeds
//!
//! # Example: a two-segment detuning ramp
//!
//! ```rust
//! use hrimfaxi_ir::{Scalar, Waveform};
//!
//! let ramp = Waveform::linear(0.0, Scalar::var("peak"), 0.5)
//!     .append(Waveform::constant(Scalar::var("peak"), 1.0));
//!
//! // Durations are structural: no evaluation needed.
//! assert_eq!(ramp.duration().simplify().as_f64(), Some(1.5));
//! ```

pub mod error;
pub mod field;
pub mod pulse;
pub mod register;
pub mod scalar;
pub mod sequence;
pub mod waveform;

pub use error::{IrError, IrResult};
pub use field::{Field, SpatialModulation};
pub use pulse::{FieldChannel, Pulse};
pub use register::{ParallelRegister, Register, RegisterExpr, SiteFilling, SiteInfo};
pub use scalar::{AssignedValue, Assignments, Interval, Scalar};
pub use sequence::{LevelCoupling, Sequence};
pub use waveform::{AlignedValue, Alignment, Interpolation, Waveform};
