//! Hrimfaxi hardware task specification.
//!
//! Types on the boundary between the compiler and the execution backends:
//! the discretized, SI-unit [`TaskSpecification`] the compiler emits, the
//! raw [`TaskResults`] a backend returns, and the [`ParallelDecoder`] that
//! folds tiled-register measurements back onto the base register.

pub mod error;
pub mod parallel;
pub mod results;
pub mod specification;

pub use error::{TaskError, TaskResult};
pub use parallel::{ClusterIndex, ParallelDecoder, SiteClusterInfo};
pub use results::{ShotResult, ShotStatus, TaskResults, TaskStatus};
pub use specification::{
    Channel, EffectiveHamiltonian, GlobalField, Lattice, LocalField, TaskSpecification,
};
