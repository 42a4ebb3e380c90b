//! Outbound change-request submission.

use crate::tracking::JobTracker;
use changegate_core::error::{GateError, Result};
use changegate_core::registry::{CorrelationRegistry, PendingWait, RegisterOutcome};
use changegate_core::transport::{ChangeTransport, EndpointResolver, HttpMethod, TransportResponse};
use changegate_core::types::{ExecutionId, JobId, Token};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Change types the external system accepts.
pub const CHANGE_TYPES: &[&str] = &["normal", "standard", "emergency"];

/// Longest decision deadline accepted (100 years).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Path under the public base URL where callbacks are received.
pub const CALLBACK_PATH: &str = "/api/v1/callbacks";

/// A change request to submit for one job run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Job the request gates.
    pub job_id: JobId,
    /// Build number of the run.
    pub build_number: String,
    /// One-line summary shown to approvers.
    pub short_description: String,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// One of [`CHANGE_TYPES`].
    #[serde(default)]
    pub change_type: Option<String>,
    /// Extra attributes declared by the execution, sent as-is.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Deadline for the decision; falls back to the issuer default.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ChangeRequest {
    /// Create a request with the required fields.
    pub fn new(
        job_id: impl Into<JobId>,
        build_number: impl Into<String>,
        short_description: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            build_number: build_number.into(),
            short_description: short_description.into(),
            description: None,
            change_type: None,
            attributes: serde_json::Map::new(),
            timeout: None,
        }
    }

    /// Set the long description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the change type.
    pub fn with_change_type(mut self, change_type: impl Into<String>) -> Self {
        self.change_type = Some(change_type.into());
        self
    }

    /// Add a declared attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Set the decision deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check required fields.
    ///
    /// # Errors
    /// [`GateError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        require("job_id", self.job_id.as_str())?;
        require("build_number", &self.build_number)?;
        require("short_description", &self.short_description)?;
        check_timeout("timeout", self.timeout)?;

        if let Some(change_type) = &self.change_type {
            let normalized = change_type.trim().to_ascii_lowercase();
            if !CHANGE_TYPES.contains(&normalized.as_str()) {
                return Err(GateError::Validation {
                    field: "change_type".to_string(),
                    cause: format!(
                        "'{}' is not one of {}",
                        change_type,
                        CHANGE_TYPES.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }

    /// Build the submission payload.
    ///
    /// Declared attributes go first so the fields above always win.
    pub fn to_payload(&self, tool_id: &str, callback_url: &str) -> serde_json::Value {
        let mut payload = self.attributes.clone();
        let mut set = |key: &str, value: serde_json::Value| {
            payload.insert(key.to_string(), value);
        };

        set("tool_id", tool_id.into());
        set("job_id", self.job_id.as_str().into());
        set("build_number", self.build_number.as_str().into());
        set("short_description", self.short_description.as_str().into());
        if let Some(description) = &self.description {
            set("description", description.as_str().into());
        }
        if let Some(change_type) = &self.change_type {
            set("change_type", change_type.trim().to_ascii_lowercase().into());
        }
        set("callback_url", callback_url.into());

        serde_json::Value::Object(payload)
    }
}

fn check_timeout(field: &str, timeout: Option<Duration>) -> Result<()> {
    match timeout {
        Some(timeout) if timeout > MAX_TIMEOUT => Err(GateError::Validation {
            field: field.to_string(),
            cause: format!(
                "{}s exceeds the maximum of {}s",
                timeout.as_secs(),
                MAX_TIMEOUT.as_secs()
            ),
        }),
        _ => Ok(()),
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(GateError::Validation {
            field: field.to_string(),
            cause: "required field is empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// A submission that produced a registered wait.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Token the wait is registered under: the external system's token if it
    /// returned one, otherwise the locally minted one.
    pub token: Token,
    /// Callback URL sent to the external system. Its token always resolves to
    /// the registered wait.
    pub callback_url: String,
    /// Deadline applied to the wait.
    pub timeout: Option<Duration>,
    /// Response body from the external system.
    pub response: serde_json::Value,
    /// Registration side effects (superseded waits).
    pub registration: RegisterOutcome,
}

/// Validates, submits and registers change requests.
pub struct Issuer {
    transport: Arc<dyn ChangeTransport>,
    resolver: Arc<dyn EndpointResolver>,
    registry: Arc<CorrelationRegistry>,
    tracker: JobTracker,
    public_base_url: String,
    tool_id: String,
    default_timeout: Option<Duration>,
}

impl Issuer {
    /// Create an issuer.
    pub fn new(
        transport: Arc<dyn ChangeTransport>,
        resolver: Arc<dyn EndpointResolver>,
        registry: Arc<CorrelationRegistry>,
    ) -> Self {
        let tool_id = "changegate".to_string();
        Self {
            tracker: JobTracker::new(Arc::clone(&registry), &tool_id),
            transport,
            resolver,
            registry,
            public_base_url: "http://localhost:8080".to_string(),
            tool_id,
            default_timeout: None,
        }
    }

    /// Set the externally reachable base URL for callbacks.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    /// Set the token prefix.
    pub fn with_tool_id(mut self, tool_id: impl Into<String>) -> Self {
        self.tool_id = tool_id.into();
        self.tracker = JobTracker::new(Arc::clone(&self.registry), &self.tool_id);
        self
    }

    /// Set the deadline used when a request carries none.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The job tracker minting this issuer's tokens.
    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Callback URL for a token.
    pub fn callback_url(&self, token: &Token) -> String {
        format!(
            "{}{}/{}",
            self.public_base_url.trim_end_matches('/'),
            CALLBACK_PATH,
            token
        )
    }

    /// Submit a change request and register the wait for `execution_id`.
    ///
    /// Nothing is registered unless the external system accepted the request.
    ///
    /// # Errors
    /// Validation, endpoint, transport, authentication and rejection failures,
    /// plus registration errors.
    pub async fn submit(
        &self,
        execution_id: ExecutionId,
        request: &ChangeRequest,
    ) -> Result<Submission> {
        request.validate()?;
        let timeout = request.timeout.or(self.default_timeout);
        check_timeout("timeout", timeout)?;
        let job_id = &request.job_id;
        let endpoint = self.resolver.resolve(job_id)?;

        let local_token = self.tracker.track_job(job_id);
        let callback_url = self.callback_url(&local_token);
        let payload = request.to_payload(&self.tool_id, &callback_url);

        tracing::info!(
            job_id = %job_id,
            execution_id = %execution_id,
            endpoint = %endpoint.url,
            "Submitting change request"
        );

        let response = self
            .transport
            .send(HttpMethod::Post, &endpoint, &payload)
            .await
            .map_err(|e| GateError::SubmissionFailed {
                job_id: job_id.clone(),
                cause: e.to_string(),
            })?;

        let body = normalize_response(job_id, &endpoint.url, response)?;

        // The advertised callback URL carries the local token; when the
        // external system issues its own, the local one becomes an alias.
        let (token, alias) = match returned_token(&body).map(Token::parse) {
            Some(Ok(returned)) if returned != local_token => (returned, Some(local_token)),
            Some(Err(e)) => {
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    "Ignoring unusable token returned by change-control system"
                );
                (local_token, None)
            }
            _ => (local_token, None),
        };

        let mut wait = PendingWait::new(token.clone(), execution_id)
            .for_job(job_id.clone())
            .with_metadata(serde_json::json!({
                "endpoint": endpoint.url,
                "build_number": request.build_number,
                "callback_url": callback_url,
            }));
        if let Some(timeout) = timeout {
            wait = wait.with_timeout(timeout);
        }
        if let Some(alias) = alias {
            wait = wait.with_alias(alias);
        }

        let registration = self.registry.register(wait)?;

        tracing::info!(
            job_id = %job_id,
            token = %token,
            execution_id = %execution_id,
            "Change request accepted"
        );

        Ok(Submission {
            token,
            callback_url,
            timeout,
            response: body,
            registration,
        })
    }
}

/// Turn a transport response into the success body or a submission error.
fn normalize_response(
    job_id: &JobId,
    endpoint: &str,
    response: TransportResponse,
) -> Result<serde_json::Value> {
    if response.is_auth_failure() {
        return Err(GateError::Authentication {
            endpoint: endpoint.to_string(),
            cause: format!("HTTP {}", response.status),
        });
    }

    let envelope_status = response
        .body
        .get("status")
        .and_then(|s| s.as_str())
        .map(str::to_ascii_lowercase);

    if envelope_status.as_deref() == Some("error") {
        return Err(GateError::SubmissionRejected {
            job_id: job_id.clone(),
            message: error_message(&response.body)
                .unwrap_or_else(|| format!("HTTP {}", response.status)),
        });
    }

    if !response.is_success() {
        return Err(GateError::SubmissionFailed {
            job_id: job_id.clone(),
            cause: match error_message(&response.body) {
                Some(message) => format!("HTTP {}: {}", response.status, message),
                None => format!("HTTP {}", response.status),
            },
        });
    }

    Ok(response.body)
}

fn error_message(body: &serde_json::Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| match body.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(o) => o.get("message")?.as_str().map(str::to_string),
            _ => None,
        })
}

fn returned_token(body: &serde_json::Value) -> Option<&str> {
    ["token", "callback_token"]
        .iter()
        .find_map(|key| body.get(key)?.as_str())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use changegate_core::decision::{CallbackDecision, DecisionResult};
    use changegate_core::registry::{Resolution, WaitStatus};
    use changegate_core::transport::{Endpoint, TransportFuture};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Transport that replays one scripted outcome and records payloads.
    struct ScriptedTransport {
        outcome: Mutex<Option<Result<TransportResponse>>>,
        sent: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedTransport {
        fn replying(status: u16, body: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(Ok(TransportResponse::new(status, body)))),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(Err(GateError::Network {
                    cause: "connection refused".into(),
                }))),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChangeTransport for ScriptedTransport {
        fn send<'a>(
            &'a self,
            _method: HttpMethod,
            _endpoint: &'a Endpoint,
            payload: &'a serde_json::Value,
        ) -> TransportFuture<'a> {
            self.sent.lock().push(payload.clone());
            let outcome = self
                .outcome
                .lock()
                .take()
                .unwrap_or_else(|| Ok(TransportResponse::new(200, json!({"status": "success"}))));
            Box::pin(async move { outcome })
        }
    }

    fn make_issuer(transport: Arc<ScriptedTransport>) -> (Issuer, Arc<CorrelationRegistry>) {
        let registry = Arc::new(CorrelationRegistry::new());
        let issuer = Issuer::new(
            transport,
            Arc::new(Endpoint::new("https://cm.example.com/change")),
            Arc::clone(&registry),
        )
        .with_public_base_url("https://gate.example.com/")
        .with_tool_id("T1");
        (issuer, registry)
    }

    #[test]
    fn validation_names_missing_field() {
        let err = ChangeRequest::new("J1", "", "deploy").validate().unwrap_err();
        assert_eq!(err.code(), "E201");
        assert!(err.to_string().contains("build_number"));

        let err = ChangeRequest::new("J1", "7", "deploy")
            .with_change_type("urgent")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("change_type"));

        ChangeRequest::new("J1", "7", "deploy")
            .with_change_type("Emergency")
            .validate()
            .unwrap();
    }

    #[tokio::test]
    async fn oversized_timeout_is_rejected_before_submission() {
        let transport = ScriptedTransport::replying(201, json!({"status": "success"}));
        let (issuer, registry) = make_issuer(Arc::clone(&transport));
        let request = ChangeRequest::new("J1", "42", "deploy")
            .with_timeout(Duration::from_secs(1_000_000_000_000_000));

        assert_eq!(request.validate().unwrap_err().code(), "E201");

        let err = issuer.submit(ExecutionId::new(), &request).await.unwrap_err();
        assert!(err.to_string().contains("timeout"));
        assert!(transport.sent.lock().is_empty());
        assert!(registry.is_empty());

        let (issuer, _) = make_issuer(ScriptedTransport::replying(201, json!({})));
        let issuer = issuer.with_default_timeout(Some(Duration::MAX));
        let err = issuer
            .submit(ExecutionId::new(), &ChangeRequest::new("J1", "42", "deploy"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E201");
    }

    #[test]
    fn payload_fields_override_attributes() {
        let request = ChangeRequest::new("J1", "42", "deploy api")
            .with_attribute("job_id", json!("spoofed"))
            .with_attribute("assignment_group", json!("ops"));
        let payload = request.to_payload("T1", "https://gate/cb/x");

        assert_eq!(payload["job_id"], "J1");
        assert_eq!(payload["assignment_group"], "ops");
        assert_eq!(payload["callback_url"], "https://gate/cb/x");
        assert_eq!(payload["tool_id"], "T1");
    }

    #[tokio::test]
    async fn accepted_submission_registers_wait() {
        let transport = ScriptedTransport::replying(201, json!({"status": "success"}));
        let (issuer, registry) = make_issuer(Arc::clone(&transport));
        let execution = ExecutionId::new();

        let submission = issuer
            .submit(execution, &ChangeRequest::new("J1", "42", "deploy"))
            .await
            .unwrap();

        assert!(submission.token.as_str().starts_with("T1_"));
        assert!(submission.token.as_str().ends_with("_J1"));
        assert_eq!(
            submission.callback_url,
            format!("https://gate.example.com/api/v1/callbacks/{}", submission.token)
        );
        assert_eq!(registry.lookup_by_token(&submission.token), Some(execution));
        assert_eq!(
            transport.sent.lock()[0]["callback_url"],
            submission.callback_url.as_str()
        );
    }

    #[tokio::test]
    async fn returned_token_is_used_verbatim() {
        let transport =
            ScriptedTransport::replying(200, json!({"status": "success", "token": "CHG0042"}));
        let (issuer, registry) = make_issuer(transport);

        let submission = issuer
            .submit(ExecutionId::new(), &ChangeRequest::new("J1", "42", "deploy"))
            .await
            .unwrap();

        assert_eq!(submission.token.as_str(), "CHG0042");
        assert!(registry.get(&submission.token).is_some());

        let advertised = submission
            .callback_url
            .rsplit('/')
            .next()
            .map(Token::parse)
            .unwrap()
            .unwrap();
        assert_ne!(advertised, submission.token);
        assert_eq!(registry.canonical(&advertised), submission.token);

        let decision = CallbackDecision::new(advertised.clone(), DecisionResult::Approved);
        assert!(matches!(
            registry.resolve(&advertised, decision),
            Resolution::Resolved { .. }
        ));
        assert_eq!(
            registry.get(&submission.token).unwrap().status(),
            WaitStatus::Resolved
        );
    }

    #[tokio::test]
    async fn unusable_returned_token_falls_back_to_local() {
        let transport = ScriptedTransport::replying(
            200,
            json!({"status": "success", "token": "not a token/../x"}),
        );
        let (issuer, registry) = make_issuer(transport);

        let submission = issuer
            .submit(ExecutionId::new(), &ChangeRequest::new("J1", "42", "deploy"))
            .await
            .unwrap();

        assert!(submission.token.as_str().starts_with("T1_"));
        assert!(submission.callback_url.ends_with(submission.token.as_str()));
        assert!(registry.get(&submission.token).unwrap().wait.alias.is_none());
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_transport() {
        let transport = ScriptedTransport::replying(200, json!({}));
        let (issuer, registry) = make_issuer(Arc::clone(&transport));

        let err = issuer
            .submit(ExecutionId::new(), &ChangeRequest::new("J1", "42", "  "))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "E201");
        assert!(transport.sent.lock().is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failures_register_nothing() {
        let cases = vec![
            (ScriptedTransport::failing(), "E202"),
            (ScriptedTransport::replying(401, json!({})), "E204"),
            (
                ScriptedTransport::replying(200, json!({"status": "error", "message": "no CAB"})),
                "E203",
            ),
            (ScriptedTransport::replying(503, json!(null)), "E202"),
        ];

        for (transport, code) in cases {
            let (issuer, registry) = make_issuer(transport);
            let err = issuer
                .submit(ExecutionId::new(), &ChangeRequest::new("J1", "42", "deploy"))
                .await
                .unwrap_err();

            assert_eq!(err.code(), code, "unexpected error: {}", err);
            assert!(err.is_submission_error());
            assert!(registry.is_empty());
        }
    }

    #[tokio::test]
    async fn rejection_message_is_kept() {
        let transport = ScriptedTransport::replying(
            200,
            json!({"status": "error", "error": {"message": "window closed"}}),
        );
        let (issuer, _) = make_issuer(transport);

        let err = issuer
            .submit(ExecutionId::new(), &ChangeRequest::new("J1", "42", "deploy"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("window closed"));
    }
}
