//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur in backend operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Task submission failed.
    #[error("Task submission failed: {0}")]
    SubmissionFailed(String),

    /// Task execution failed.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Task was cancelled.
    #[error("Task cancelled")]
    TaskCancelled,

    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Results requested before the task completed.
    #[error("Task {0} has not completed")]
    NotCompleted(String),

    /// Invalid number of shots.
    #[error("Invalid shot count: {0}")]
    InvalidShots(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout waiting for a task.
    #[error("Timeout waiting for task {0}")]
    Timeout(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
