//! Wait states and outcomes.

use changegate_core::decision::{CallbackDecision, DecisionResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one gated execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    /// The change request is in flight; no wait exists yet.
    Submitting,
    /// A wait is registered and the execution is suspended.
    Waiting,
    /// Approved by the external system.
    Approved,
    /// Rejected by the external system.
    Rejected,
    /// Withdrawn on the external side.
    Canceled,
    /// No decision before the deadline.
    TimedOut,
    /// Submission failed, or the external system reported a communication failure.
    CommFailure,
    /// The owning execution was cancelled upstream.
    Aborted,
}

impl WaitState {
    /// Whether the state is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitting | Self::Waiting)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitting => "submitting",
            Self::Waiting => "waiting",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::TimedOut => "timed_out",
            Self::CommFailure => "comm_failure",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a wait ended, as seen by the suspended execution.
///
/// `TimedOut` is distinct from `Rejected` and `CommFailure` so callers can
/// decide separately what "no answer" means for the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Approved, with approver comments.
    Approved {
        /// Approver comments.
        comments: Option<String>,
    },
    /// Rejected.
    Rejected {
        /// Approver comments.
        comments: Option<String>,
    },
    /// Withdrawn on the external side.
    Canceled {
        /// Comments from the external system.
        comments: Option<String>,
    },
    /// The external system reported a communication failure.
    CommFailure {
        /// Comments from the external system.
        comments: Option<String>,
    },
    /// The deadline passed without a decision.
    TimedOut,
}

impl WaitOutcome {
    /// Outcome for a terminal decision; `None` for interim updates.
    pub fn from_decision(decision: &CallbackDecision) -> Option<Self> {
        let comments = decision.comments.clone();
        Some(match decision.result {
            DecisionResult::Approved => Self::Approved { comments },
            DecisionResult::Rejected => Self::Rejected { comments },
            DecisionResult::Canceled => Self::Canceled { comments },
            DecisionResult::CommFailure => Self::CommFailure { comments },
            DecisionResult::Pending => return None,
        })
    }

    /// The terminal state this outcome puts the execution in.
    pub fn state(&self) -> WaitState {
        match self {
            Self::Approved { .. } => WaitState::Approved,
            Self::Rejected { .. } => WaitState::Rejected,
            Self::Canceled { .. } => WaitState::Canceled,
            Self::CommFailure { .. } => WaitState::CommFailure,
            Self::TimedOut => WaitState::TimedOut,
        }
    }

    /// Whether the gated execution may proceed.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// Comments attached to the decision, if any.
    pub fn comments(&self) -> Option<&str> {
        match self {
            Self::Approved { comments }
            | Self::Rejected { comments }
            | Self::Canceled { comments }
            | Self::CommFailure { comments } => comments.as_deref(),
            Self::TimedOut => None,
        }
    }
}
