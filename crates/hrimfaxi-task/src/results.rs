//! Raw measurement records returned by an execution backend.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Accepted, waiting in queue.
    Enqueued,
    /// Currently executing on the device.
    Executing,
    /// Finished successfully; results are available.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl TaskStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Enqueued => write!(f, "Enqueued"),
            TaskStatus::Executing => write!(f, "Executing"),
            TaskStatus::Completed => write!(f, "Completed"),
            TaskStatus::Failed => write!(f, "Failed"),
            TaskStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Per-shot acquisition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotStatus {
    /// Both occupancy images were acquired.
    Completed,
    /// The pre-sequence image is missing.
    MissingPreSequence,
    /// The post-sequence image is missing.
    MissingPostSequence,
}

/// One measurement shot: site occupancy before and after the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotResult {
    /// Acquisition status of this shot.
    pub shot_status: ShotStatus,
    /// Occupancy per site before the drive sequence, 1 for occupied.
    pub pre_sequence: Vec<u8>,
    /// Occupancy per site after the drive sequence.
    pub post_sequence: Vec<u8>,
}

/// All shots of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResults {
    /// Final task status.
    pub task_status: TaskStatus,
    /// One record per shot.
    pub shot_outputs: Vec<ShotResult>,
}
