//! Wait, callback and execution operations.

use crate::client::Client;
use crate::error::Result;
use crate::types::{
    CancelReport, DeliveryReport, ExecutionId, ExecutionInfo, HealthStatus, JobDecision,
    PendingWait, WaitRecord,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ListWaitsResponse {
    waits: Vec<PendingWait>,
}

impl Client {
    /// Check server health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.get("health").await?;
        self.handle_response(response).await
    }

    /// List pending waits.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use changegate_client::Client;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = Client::new("http://localhost:8080")?;
    /// for wait in client.list_waits().await? {
    ///     println!("{} -> {}", wait.token, wait.execution_id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_waits(&self) -> Result<Vec<PendingWait>> {
        let response = self.get("waits").await?;
        let list: ListWaitsResponse = self.handle_response(response).await?;
        Ok(list.waits)
    }

    /// Fetch the registry record for a token, `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_wait(&self, token: &str) -> Result<Option<WaitRecord>> {
        let path = format!("callbacks/{}", urlencoding::encode(token));
        let response = self.get(&path).await?;
        self.handle_optional(response).await
    }

    /// Deliver a JSON decision body for a token.
    ///
    /// Delivery outcomes the server reports with 4xx (unknown token,
    /// malformed body) come back as a report rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a
    /// delivery report.
    pub async fn deliver_callback(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<DeliveryReport> {
        let path = format!("callbacks/{}", urlencoding::encode(token));
        let bytes = serde_json::to_vec(body)?;
        let response = self.post_raw(&path, bytes, "application/json").await?;

        let status = response.status();
        if status.as_u16() == 404 || status.as_u16() == 400 {
            let text = response.text().await?;
            if let Ok(report) = serde_json::from_str::<DeliveryReport>(&text) {
                return Ok(report);
            }
            return Err(crate::error::ClientError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        self.handle_response(response).await
    }

    /// Decision state for a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn job_decision(&self, job_id: &str) -> Result<JobDecision> {
        let path = format!("jobs/{}/decision", urlencoding::encode(job_id));
        let response = self.get(&path).await?;
        self.handle_response(response).await
    }

    /// Orchestrator view of an execution, `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_execution(&self, execution_id: ExecutionId) -> Result<Option<ExecutionInfo>> {
        let response = self.get(&format!("executions/{}", execution_id)).await?;
        self.handle_optional(response).await
    }

    /// Cancel an execution's pending waits.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`](crate::ClientError::Api) with status 404
    /// if the server does not know the execution.
    pub async fn cancel_execution(&self, execution_id: ExecutionId) -> Result<CancelReport> {
        let response = self.delete(&format!("executions/{}", execution_id)).await?;
        self.handle_response(response).await
    }
}
