//! Backend trait and task lifecycle types.
//!
//! The [`Backend`] trait defines the lifecycle for executing a compiled
//! task:
//!
//! ```text
//!   submit() ──→ status() ──→ fetch()
//!                   │
//!                   └──→ cancel()
//! ```
//!
//! Backends are a closed set selected at construction time — an
//! in-process emulator stub and a remote provider client — never chosen
//! by runtime string dispatch.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hrimfaxi_task::{TaskResults, TaskSpecification, TaskStatus};

use crate::error::{HalError, HalResult};

/// Unique identifier for a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new task ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trait for execution backends.
///
/// # Contract
///
/// - `submit()` MUST validate the task before accepting it and return an
///   ID whose initial status is `Enqueued` or later.
/// - `fetch()` MUST only succeed when `status()` reports `Completed`.
/// - `cancel()` on a terminal task is a no-op.
/// - `wait()` has a default implementation (500ms poll, 5-minute timeout).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Submit a compiled task for execution.
    async fn submit(&self, task: &TaskSpecification) -> HalResult<TaskId>;

    /// Get the status of a submitted task.
    async fn status(&self, id: &TaskId) -> HalResult<TaskStatus>;

    /// Fetch the results of a completed task.
    async fn fetch(&self, id: &TaskId) -> HalResult<TaskResults>;

    /// Cancel a submitted task.
    async fn cancel(&self, id: &TaskId) -> HalResult<()>;

    /// Wait for a task to complete and fetch its results.
    ///
    /// Default implementation polls every 500ms for up to 5 minutes.
    async fn wait(&self, id: &TaskId) -> HalResult<TaskResults> {
        use tokio::time::sleep;

        let poll_interval = Duration::from_millis(500);
        let max_polls = 600; // 5 minutes max

        for _ in 0..max_polls {
            match self.status(id).await? {
                TaskStatus::Completed => return self.fetch(id).await,
                TaskStatus::Failed => {
                    return Err(HalError::TaskFailed(id.0.clone()));
                }
                TaskStatus::Cancelled => return Err(HalError::TaskCancelled),
                TaskStatus::Enqueued | TaskStatus::Executing => {
                    sleep(poll_interval).await;
                }
            }
        }

        Err(HalError::Timeout(id.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display() {
        let id = TaskId::new("task-42");
        assert_eq!(id.to_string(), "task-42");
    }
}
