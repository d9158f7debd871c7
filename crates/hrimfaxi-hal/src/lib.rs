//! Hrimfaxi Hardware Abstraction Layer.
//!
//! Defines the [`Backend`] trait for executing compiled task
//! specifications, plus a closed set of implementations: the in-process
//! [`EmulatorBackend`] and the HTTP [`RemoteBackend`]. The compiler never
//! talks to a backend; callers compile first and submit the resulting
//! [`TaskSpecification`](hrimfaxi_task::TaskSpecification)s, possibly many
//! concurrently — each task is independent.

pub mod backend;
pub mod emulator;
pub mod error;
pub mod remote;

pub use backend::{Backend, TaskId};
pub use emulator::EmulatorBackend;
pub use error::{HalError, HalResult};
pub use remote::RemoteBackend;
