//! Pending-wait records owned by the correlation registry.

use crate::decision::CallbackDecision;
use crate::types::{ExecutionId, JobId, Token};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle status of a pending wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStatus {
    /// Registered and waiting for a decision.
    Pending,
    /// A terminal decision was delivered.
    Resolved,
    /// The deadline passed before a decision arrived.
    Expired,
    /// The owning execution was cancelled or superseded.
    Cancelled,
}

impl WaitStatus {
    /// Whether the status is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of one suspended execution awaiting an external decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWait {
    /// Correlation token the callback will be addressed to.
    pub token: Token,
    /// The execution that will be resumed.
    pub execution_id: ExecutionId,
    /// The pipeline job this wait is tracked under, if any.
    pub job_id: Option<JobId>,
    /// When the wait was registered.
    pub created_at: DateTime<Utc>,
    /// Wall-clock deadline (None = wait indefinitely).
    pub expires_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: WaitStatus,
    /// Submission details kept for inspection.
    pub metadata: serde_json::Value,
    /// Second token addressing this wait, when the external system issued
    /// its own token after the callback URL was already advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<Token>,
}

impl PendingWait {
    /// Create a pending wait with no deadline.
    pub fn new(token: Token, execution_id: ExecutionId) -> Self {
        Self {
            token,
            execution_id,
            job_id: None,
            created_at: Utc::now(),
            expires_at: None,
            status: WaitStatus::Pending,
            metadata: serde_json::Value::Null,
            alias: None,
        }
    }

    /// Track this wait under a job.
    pub fn for_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Set an absolute deadline.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the deadline relative to the creation time.
    ///
    /// A timeout too large to represent as a wall-clock instant leaves the
    /// wait without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|delta| self.created_at.checked_add_signed(delta));
        self
    }

    /// Also accept callbacks addressed to `alias`.
    pub fn with_alias(mut self, alias: Token) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Time left until the deadline (None if no deadline or already past).
    #[must_use]
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|exp| (exp - Utc::now()).to_std().ok())
            .filter(|left| !left.is_zero())
    }
}

/// Full registry record: the wait plus what happened to it.
///
/// This is the unit persisted by a [`RegistryStore`](super::RegistryStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitRecord {
    /// The wait descriptor.
    #[serde(flatten)]
    pub wait: PendingWait,
    /// Terminal decision, once resolved.
    pub decision: Option<CallbackDecision>,
    /// Whether the decision has been handed to the owning execution.
    #[serde(default)]
    pub decision_delivered: bool,
    /// Most recent interim (pending) update.
    pub last_update: Option<CallbackDecision>,
    /// When the record reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WaitRecord {
    /// Wrap a freshly registered wait.
    pub fn new(wait: PendingWait) -> Self {
        Self {
            wait,
            decision: None,
            decision_delivered: false,
            last_update: None,
            finished_at: None,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> WaitStatus {
        self.wait.status
    }

    /// Move to a terminal status.
    pub(crate) fn finish(&mut self, status: WaitStatus, now: DateTime<Utc>) {
        self.wait.status = status;
        self.finished_at = Some(now);
    }
}
