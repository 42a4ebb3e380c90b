//! Error types for changegate.
//!
//! Every variant carries the identifiers (token, execution, job) needed to
//! correlate a failure with the wait it belongs to. Messages are prefixed with
//! a stable code so operators can grep logs and API responses alike.

use crate::types::{ExecutionId, JobId};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for changegate operations.
#[derive(Error, Debug)]
pub enum GateError {
    // =========================================================================
    // Registry Errors (E100-E199)
    // =========================================================================
    /// A wait is already pending under this token.
    #[error("E101: Token '{token}' already has a pending wait")]
    DuplicateToken {
        /// The token that was registered twice.
        token: String,
    },

    /// The token is not usable as a correlation key.
    #[error("E102: Invalid token '{token}': {cause}")]
    InvalidToken {
        /// The rejected token text.
        token: String,
        /// Why the token was rejected.
        cause: String,
    },

    // =========================================================================
    // Submission Errors (E200-E299)
    // =========================================================================
    /// The change request failed validation before submission.
    #[error("E201: Invalid change request field '{field}': {cause}")]
    Validation {
        /// The offending field.
        field: String,
        /// Why the field is invalid.
        cause: String,
    },

    /// The change request could not be delivered to the external system.
    #[error("E202: Submission failed for job '{job_id}': {cause}")]
    SubmissionFailed {
        /// The job whose request failed.
        job_id: JobId,
        /// Transport-level cause.
        cause: String,
    },

    /// The external system answered with an error envelope.
    #[error("E203: Submission rejected for job '{job_id}': {message}")]
    SubmissionRejected {
        /// The job whose request was rejected.
        job_id: JobId,
        /// Message from the error envelope.
        message: String,
    },

    /// The external system refused our credentials.
    #[error("E204: Authentication failed against {endpoint}: {cause}")]
    Authentication {
        /// Endpoint that rejected the credentials.
        endpoint: String,
        /// Reason given by the transport.
        cause: String,
    },

    /// No endpoint is configured for the job.
    #[error("E205: No change-control endpoint configured for job '{job_id}'")]
    EndpointNotConfigured {
        /// The job that has no endpoint.
        job_id: JobId,
    },

    // =========================================================================
    // Delivery Errors (E300-E399)
    // =========================================================================
    /// A callback body could not be interpreted.
    #[error("E301: Malformed callback payload for token '{token}': {cause}")]
    MalformedPayload {
        /// Token the delivery was addressed to.
        token: String,
        /// Parse failure.
        cause: String,
    },

    /// A callback arrived for a token the registry does not know.
    #[error("E302: Unknown token '{token}'")]
    UnknownToken {
        /// The unknown token.
        token: String,
    },

    /// A callback arrived for a wait that is already resolved.
    #[error("E303: Duplicate delivery for token '{token}'")]
    DuplicateDelivery {
        /// The token that was already resolved.
        token: String,
    },

    // =========================================================================
    // Wait Errors (E400-E499)
    // =========================================================================
    /// The owning execution was cancelled while waiting.
    #[error("E401: Execution {execution_id} cancelled: {reason}")]
    Cancelled {
        /// The cancelled execution.
        execution_id: ExecutionId,
        /// Why it was cancelled.
        reason: String,
    },

    /// No execution with this ID is known to the orchestrator.
    #[error("E402: Execution {execution_id} not found")]
    ExecutionNotFound {
        /// The unknown execution.
        execution_id: ExecutionId,
    },

    /// The continuation was dropped without a signal.
    #[error("E403: Wait for token '{token}' abandoned")]
    WaitAbandoned {
        /// Token of the abandoned wait.
        token: String,
    },

    // =========================================================================
    // Store Errors (E500-E599)
    // =========================================================================
    /// The registry store failed to persist or load records.
    #[error("E501: Registry store error at {path}: {cause}")]
    Store {
        /// Location of the store.
        path: PathBuf,
        /// Underlying failure.
        cause: String,
    },

    /// A record could not be serialized.
    #[error("E502: Serialization error: {0}")]
    Serialization(String),

    // =========================================================================
    // Configuration Errors (E800-E899)
    // =========================================================================
    /// A configuration value is invalid.
    #[error("E801: Invalid configuration '{field}': {cause}")]
    ConfigValue {
        /// The configuration key.
        field: String,
        /// Why the value is invalid.
        cause: String,
    },

    /// The configuration file is not valid YAML.
    #[error("E802: Failed to parse YAML at {path}: {cause}")]
    YamlParse {
        /// Path of the file.
        path: PathBuf,
        /// Parser message.
        cause: String,
    },

    // =========================================================================
    // I/O Errors (E900-E999)
    // =========================================================================
    /// File system failure.
    #[error("E901: I/O error at {path}: {cause}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying failure.
        cause: String,
    },

    /// Socket-level failure.
    #[error("E902: Network error: {cause}")]
    Network {
        /// Underlying failure.
        cause: String,
    },
}

impl GateError {
    /// Get the error code (e.g., "E101").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateToken { .. } => "E101",
            Self::InvalidToken { .. } => "E102",
            Self::Validation { .. } => "E201",
            Self::SubmissionFailed { .. } => "E202",
            Self::SubmissionRejected { .. } => "E203",
            Self::Authentication { .. } => "E204",
            Self::EndpointNotConfigured { .. } => "E205",
            Self::MalformedPayload { .. } => "E301",
            Self::UnknownToken { .. } => "E302",
            Self::DuplicateDelivery { .. } => "E303",
            Self::Cancelled { .. } => "E401",
            Self::ExecutionNotFound { .. } => "E402",
            Self::WaitAbandoned { .. } => "E403",
            Self::Store { .. } => "E501",
            Self::Serialization(_) => "E502",
            Self::ConfigValue { .. } => "E801",
            Self::YamlParse { .. } => "E802",
            Self::Io { .. } => "E901",
            Self::Network { .. } => "E902",
        }
    }

    /// True for failures that happen before a wait exists.
    ///
    /// These are always terminal and surface synchronously to the caller.
    #[must_use]
    pub fn is_submission_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::SubmissionFailed { .. }
                | Self::SubmissionRejected { .. }
                | Self::Authentication { .. }
                | Self::EndpointNotConfigured { .. }
        )
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for changegate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_prefix_messages() {
        let err = GateError::DuplicateToken {
            token: "ci_abc_job".to_string(),
        };
        assert_eq!(err.code(), "E101");
        assert!(err.to_string().starts_with("E101:"));

        let err = GateError::MalformedPayload {
            token: "t".to_string(),
            cause: "expected value".to_string(),
        };
        assert_eq!(err.code(), "E301");
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn submission_errors_are_classified() {
        let job = JobId::new("deploy/prod");
        assert!(
            GateError::SubmissionFailed {
                job_id: job.clone(),
                cause: "connection refused".to_string(),
            }
            .is_submission_error()
        );
        assert!(
            GateError::Validation {
                field: "short_description".to_string(),
                cause: "required".to_string(),
            }
            .is_submission_error()
        );
        assert!(
            !GateError::UnknownToken {
                token: "x".to_string()
            }
            .is_submission_error()
        );
    }
}
