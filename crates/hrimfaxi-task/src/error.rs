//! Error types for the task crate.

use thiserror::Error;

/// Errors that can occur building or decoding task data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// A global site index appeared in more than one cluster.
    #[error("Global site {0} is mapped to multiple clusters")]
    DuplicateGlobalSite(usize),

    /// A shot record's occupancy list does not cover a decoded site.
    #[error("Shot record has {got} sites, decoding requires at least {required}")]
    ShortShotRecord {
        /// Sites present in the record.
        got: usize,
        /// Sites the decoder needs to index.
        required: usize,
    },
}

/// Result type for task operations.
pub type TaskResult<T> = Result<T, TaskError>;
