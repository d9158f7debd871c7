//! Remote provider backend.
//!
//! A thin JSON-over-HTTP client for a hosted execution service. The
//! backend owns an endpoint and an API token; credential acquisition and
//! rotation live outside this crate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use hrimfaxi_task::{TaskResults, TaskSpecification, TaskStatus};

use crate::backend::{Backend, TaskId};
use crate::error::{HalError, HalResult};

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: TaskStatus,
}

/// Remote execution backend.
pub struct RemoteBackend {
    name: String,
    client: Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl RemoteBackend {
    /// Create a client for the given service endpoint and API token.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> HalResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(HalError::Network)?;

        Ok(Self {
            name: "remote".to_string(),
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }
}

#[async_trait]
impl Backend for RemoteBackend {
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

        let response = self
            .client
            .post(self.url("tasks"))
            .bearer_auth(&self.token)
            .json(task)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HalError::SubmissionFailed(e.to_string()))?;

        let submit: SubmitResponse = response.json().await?;
        debug!(task_id = %submit.task_id, "submitted task");
        Ok(TaskId::new(submit.task_id))
    }

    async fn status(&self, id: &TaskId) -> HalResult<TaskStatus> {
        let response = self
            .client
            .get(self.url(&format!("tasks/{id}/status")))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()
            .map_err(|_| HalError::TaskNotFound(id.0.clone()))?;

        let status: StatusResponse = response.json().await?;
        Ok(status.status)
    }

    async fn fetch(&self, id: &TaskId) -> HalResult<TaskResults> {
        let response = self
            .client
            .get(self.url(&format!("tasks/{id}/results")))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()
            .map_err(|_| HalError::NotCompleted(id.0.clone()))?;

        Ok(response.json().await?)
    }

    async fn cancel(&self, id: &TaskId) -> HalResult<()> {
        self.client
            .put(self.url(&format!("tasks/{id}/cancel")))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()
            .map_err(|_| HalError::TaskNotFound(id.0.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let backend = RemoteBackend::new("https://api.example.com/v1/", "secret").unwrap();
        let output = format!("{backend:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("secret"));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let backend = RemoteBackend::new("https://api.example.com/v1/", "t").unwrap();
        assert_eq!(backend.url("tasks"), "https://api.example.com/v1/tasks");
    }
}
