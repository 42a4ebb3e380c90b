//! Decisions delivered by the external change-control system.

use crate::types::Token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result carried by a callback delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionResult {
    /// The change was approved; the pipeline continues.
    Approved,
    /// The change was rejected.
    Rejected,
    /// The change request was withdrawn on the external side.
    Canceled,
    /// The external system could not reach its own backends.
    CommFailure,
    /// Interim status; the decision is still outstanding.
    Pending,
}

impl DecisionResult {
    /// Whether this result ends the wait.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::CommFailure => "comm_failure",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for DecisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a result string matches no known decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResult(pub String);

impl fmt::Display for UnknownResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown decision result '{}'", self.0)
    }
}

impl std::error::Error for UnknownResult {}

impl FromStr for DecisionResult {
    type Err = UnknownResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "approved" | "approve" | "accepted" | "accept" => Ok(Self::Approved),
            "rejected" | "reject" | "denied" => Ok(Self::Rejected),
            "canceled" | "cancelled" | "cancel" => Ok(Self::Canceled),
            "comm_failure" | "communication_failure" | "commfailure" => Ok(Self::CommFailure),
            "pending" | "requested" | "in_progress" => Ok(Self::Pending),
            _ => Err(UnknownResult(s.to_string())),
        }
    }
}

/// One inbound delivery, interpreted.
///
/// Transient: created per delivery and consumed once by whoever resolves the
/// wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackDecision {
    /// Token the delivery was addressed to.
    pub token: Token,
    /// The body as received, normalized to JSON.
    pub raw_payload: serde_json::Value,
    /// The decision carried by the delivery.
    pub result: DecisionResult,
    /// Free-text comments from the approver, if any.
    pub comments: Option<String>,
    /// When the delivery was received.
    pub received_at: DateTime<Utc>,
}

impl CallbackDecision {
    /// Create a decision received now.
    pub fn new(token: Token, result: DecisionResult) -> Self {
        Self {
            token,
            raw_payload: serde_json::Value::Null,
            result,
            comments: None,
            received_at: Utc::now(),
        }
    }

    /// Attach comments.
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Attach the raw payload.
    pub fn with_raw_payload(mut self, payload: serde_json::Value) -> Self {
        self.raw_payload = payload;
        self
    }
}
