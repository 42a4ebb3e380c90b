//! Inbound callback handling.
//!
//! The receiver is a failure boundary: whatever the external party sends, it
//! answers with a [`ReceiveStatus`] and never lets a bad delivery reach the
//! waiting execution.

use crate::orchestrator::Orchestrator;
use changegate_core::decision::{CallbackDecision, DecisionResult};
use changegate_core::error::GateError;
use changegate_core::registry::{CorrelationRegistry, Resolution, WaitStatus};
use changegate_core::types::{ExecutionId, Token};
use serde::Serialize;
use std::sync::Arc;

/// Largest accepted callback body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const RESULT_FIELDS: &[&str] = &["result", "status", "state", "approval"];
const COMMENT_FIELDS: &[&str] = &["comments", "comment", "message", "reason"];

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiveStatus {
    /// The delivery resolved the wait.
    Accepted {
        /// Owner of the wait.
        execution_id: ExecutionId,
        /// The decision.
        result: DecisionResult,
    },
    /// The wait was already resolved; the delivery was ignored.
    Duplicate,
    /// Interim status recorded; the wait continues.
    Interim,
    /// No live wait for the token (unknown, expired or cancelled).
    NotFound,
    /// The body could not be interpreted; the wait continues.
    Malformed {
        /// Why the body was rejected.
        reason: String,
    },
}

impl ReceiveStatus {
    /// HTTP status code for the delivery endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Accepted { .. } | Self::Duplicate => 200,
            Self::Interim => 202,
            Self::NotFound => 404,
            Self::Malformed { .. } => 400,
        }
    }

    /// Short name for logs and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Duplicate => "duplicate",
            Self::Interim => "interim",
            Self::NotFound => "not_found",
            Self::Malformed { .. } => "malformed",
        }
    }
}

/// Routes callback deliveries to the registry and the orchestrator.
#[derive(Debug, Clone)]
pub struct CallbackReceiver {
    registry: Arc<CorrelationRegistry>,
    orchestrator: Arc<Orchestrator>,
}

impl CallbackReceiver {
    /// Create a receiver.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            registry: Arc::clone(orchestrator.registry()),
            orchestrator,
        }
    }

    /// Handle one delivery addressed to `raw_token`.
    pub fn receive(
        &self,
        raw_token: &str,
        body: &[u8],
        content_type: Option<&str>,
    ) -> ReceiveStatus {
        let Ok(token) = Token::parse(raw_token) else {
            tracing::debug!(token = %raw_token, "Callback for malformed token");
            return ReceiveStatus::NotFound;
        };
        let token = self.registry.canonical(&token);

        match self.registry.get(&token).map(|r| r.status()) {
            None | Some(WaitStatus::Expired) | Some(WaitStatus::Cancelled) => {
                tracing::info!(token = %token, "Callback for unknown or expired token");
                return ReceiveStatus::NotFound;
            }
            Some(WaitStatus::Pending) | Some(WaitStatus::Resolved) => {}
        }

        let decision = match parse_decision(&token, body, content_type) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    token = %token,
                    code = e.code(),
                    error = %e,
                    "Malformed callback dropped"
                );
                return ReceiveStatus::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        match self.registry.resolve(&token, decision) {
            Resolution::Resolved {
                execution_id,
                decision,
            } => {
                let result = decision.result;
                let resumed = self.orchestrator.deliver(&token, decision);
                tracing::info!(
                    token = %token,
                    execution_id = %execution_id,
                    result = %result,
                    resumed,
                    "Callback accepted"
                );
                ReceiveStatus::Accepted {
                    execution_id,
                    result,
                }
            }
            Resolution::Updated { execution_id } => {
                tracing::info!(
                    token = %token,
                    execution_id = %execution_id,
                    "Interim callback recorded"
                );
                ReceiveStatus::Interim
            }
            Resolution::AlreadyResolved {
                status: WaitStatus::Resolved,
            } => {
                let err = GateError::DuplicateDelivery {
                    token: token.to_string(),
                };
                tracing::info!(token = %token, code = err.code(), "Duplicate callback ignored");
                ReceiveStatus::Duplicate
            }
            Resolution::AlreadyResolved { .. }
            | Resolution::NotFound
            | Resolution::Expired { .. } => {
                tracing::info!(token = %token, "Callback lost to expiry or cancellation");
                ReceiveStatus::NotFound
            }
        }
    }
}

/// Interpret a callback body as a decision.
///
/// Accepts a JSON object or `application/x-www-form-urlencoded` pairs. The
/// result is read from the first present of `result`, `status`, `state` or
/// `approval`; comments from `comments`, `comment`, `message` or `reason`.
pub fn parse_decision(
    token: &Token,
    body: &[u8],
    content_type: Option<&str>,
) -> Result<CallbackDecision, GateError> {
    let malformed = |cause: String| GateError::MalformedPayload {
        token: token.to_string(),
        cause,
    };

    if body.len() > MAX_BODY_BYTES {
        return Err(malformed(format!("body exceeds {} bytes", MAX_BODY_BYTES)));
    }
    let text = std::str::from_utf8(body).map_err(|_| malformed("body is not UTF-8".into()))?;
    if text.trim().is_empty() {
        return Err(malformed("body is empty".into()));
    }

    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    let fields = if content_type.contains("application/x-www-form-urlencoded") {
        parse_form(text).map_err(malformed)?
    } else if content_type.contains("json") {
        parse_json(text).map_err(malformed)?
    } else {
        parse_json(text)
            .or_else(|json_err| parse_form(text).map_err(|_| json_err))
            .map_err(malformed)?
    };

    let (field, raw_result) = RESULT_FIELDS
        .iter()
        .find_map(|key| Some((*key, fields.get(*key)?.as_str()?)))
        .ok_or_else(|| malformed(format!("none of {} present", RESULT_FIELDS.join(", "))))?;

    let result: DecisionResult = raw_result
        .parse()
        .map_err(|e| malformed(format!("field '{}': {}", field, e)))?;

    let mut decision = CallbackDecision::new(token.clone(), result)
        .with_raw_payload(serde_json::Value::Object(fields.clone()));
    if let Some(comments) = COMMENT_FIELDS
        .iter()
        .find_map(|key| fields.get(*key)?.as_str())
        .filter(|c| !c.is_empty())
    {
        decision = decision.with_comments(comments);
    }
    Ok(decision)
}

type Fields = serde_json::Map<String, serde_json::Value>;

fn parse_json(text: &str) -> Result<Fields, String> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

fn parse_form(text: &str) -> Result<Fields, String> {
    let mut fields = Fields::new();
    for pair in text.trim().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("form pair '{}' has no '='", pair))?;
        let key = decode_form_component(key)?;
        let value = decode_form_component(value)?;
        fields.insert(key, serde_json::Value::String(value));
    }
    if fields.is_empty() {
        return Err("form body has no fields".to_string());
    }
    Ok(fields)
}

fn decode_form_component(raw: &str) -> Result<String, String> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|s| s.into_owned())
        .map_err(|e| format!("invalid percent-encoding: {}", e))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
