//! In-process emulator backend.
//!
//! Accepts compiled tasks and synthesizes occupancy records shaped like
//! real device output: one pre/post image per shot, sized to the task's
//! lattice. It runs no physics — the numeric state-vector emulator is a
//! separate engine consuming the IR's waveform callables — but it gives
//! the submission path a complete, instantaneous lifecycle to test
//! against.

use async_trait::async_trait;
use rand::Rng;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};
use uuid::Uuid;

use hrimfaxi_task::{ShotResult, ShotStatus, TaskResults, TaskSpecification, TaskStatus};

use crate::backend::{Backend, TaskId};
use crate::error::{HalError, HalResult};

struct EmulatedTask {
    status: TaskStatus,
    results: Option<TaskResults>,
}

/// Local emulator backend with an immediate task lifecycle.
pub struct EmulatorBackend {
    name: String,
    tasks: Arc<Mutex<FxHashMap<String, EmulatedTask>>>,
}

impl EmulatorBackend {
    /// Create a new emulator backend.
    pub fn new() -> Self {
        Self {
            name: "emulator".to_string(),
            tasks: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    fn synthesize_results(task: &TaskSpecification) -> TaskResults {
        let mut rng = rand::thread_rng();
        let shot_outputs = (0..task.shot_count)
            .map(|_| {
                let pre_sequence = task.lattice.filling.clone();
                let post_sequence = task
                    .lattice
                    .filling
                    .iter()
                    .map(|filled| {
                        if *filled == 1 && rng.gen_bool(0.5) {
                            1
                        } else {
                            0
                        }
                    })
                    .collect();
                ShotResult {
                    shot_status: ShotStatus::Completed,
                    pre_sequence,
                    post_sequence,
                }
            })
            .collect();

        TaskResults {
            task_status: TaskStatus::Completed,
            shot_outputs,
        }
    }
}

impl Default for EmulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for EmulatorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, task))]
    async fn submit(&self, task: &TaskSpecification) -> HalResult<TaskId> {
        if task.shot_count == 0 {
            return Err(HalError::InvalidShots(
                "shot count must be positive".to_string(),
            ));
        }

        let id = TaskId::new(Uuid::new_v4().to_string());
        let results = Self::synthesize_results(task);
        debug!(
            task_id = %id,
            shots = task.shot_count,
            sites = task.lattice.sites.len(),
            "emulated task"
        );

        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tasks.insert(
            id.0.clone(),
            EmulatedTask {
                status: TaskStatus::Completed,
                results: Some(results),
            },
        );
        Ok(id)
    }

    async fn status(&self, id: &TaskId) -> HalResult<TaskStatus> {
        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tasks
            .get(&id.0)
            .map(|task| task.status)
            .ok_or_else(|| HalError::TaskNotFound(id.0.clone()))
    }

    async fn fetch(&self, id: &TaskId) -> HalResult<TaskResults> {
        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let task = tasks
            .get(&id.0)
            .ok_or_else(|| HalError::TaskNotFound(id.0.clone()))?;
        match task.status {
            TaskStatus::Completed => task
                .results
                .clone()
                .ok_or_else(|| HalError::NotCompleted(id.0.clone())),
            _ => Err(HalError::NotCompleted(id.0.clone())),
        }
    }

    async fn cancel(&self, id: &TaskId) -> HalResult<()> {
        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match tasks.get_mut(&id.0) {
            Some(task) => {
                if !task.status.is_terminal() {
                    task.status = TaskStatus::Cancelled;
                }
                Ok(())
            }
            None => Err(HalError::TaskNotFound(id.0.clone())),
        }
    }
}
