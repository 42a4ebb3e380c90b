//! Response types for the changegate API.
//!
//! Records the server stores are shared with `changegate-core`; the rest are
//! client-side views of handler responses.

use serde::{Deserialize, Serialize};

pub use changegate_core::decision::{CallbackDecision, DecisionResult};
pub use changegate_core::registry::{PendingWait, WaitRecord, WaitStatus};
pub use changegate_core::types::{ExecutionId, JobId, Token};

/// What the server did with a delivered callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// `accepted`, `duplicate`, `interim`, `not_found` or `malformed`.
    pub status: String,
    /// Owner of the wait, when accepted.
    #[serde(default)]
    pub execution_id: Option<ExecutionId>,
    /// The decision, when accepted.
    #[serde(default)]
    pub result: Option<DecisionResult>,
    /// Why the body was rejected, when malformed.
    #[serde(default)]
    pub reason: Option<String>,
}

impl DeliveryReport {
    /// The delivery resolved the wait.
    pub fn is_accepted(&self) -> bool {
        self.status == "accepted"
    }
}

/// Decision state for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDecision {
    /// The job.
    pub job_id: JobId,
    /// Whether the job has a pending wait or an uncollected decision.
    pub tracked: bool,
    /// Token of the job's current wait.
    pub token: Option<Token>,
    /// Decision, once one arrived.
    pub decision: Option<CallbackDecision>,
}

/// Orchestrator view of an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionInfo {
    /// The execution.
    pub execution_id: ExecutionId,
    /// Wait state (`waiting`, `approved`, `timed_out`, ...).
    pub state: String,
    /// Token of the current wait.
    pub token: Option<Token>,
    /// Job the execution gates.
    pub job_id: Option<JobId>,
    /// Last state change (RFC 3339).
    pub updated_at: String,
}

/// Result of cancelling an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelReport {
    /// The cancelled execution.
    pub execution_id: ExecutionId,
    /// Pending waits that were removed.
    pub cancelled_tokens: Vec<Token>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Health status (e.g., "healthy").
    pub status: String,
    /// Service name.
    pub service: String,
}
