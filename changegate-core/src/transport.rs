//! Outbound transport and endpoint resolution seams.
//!
//! The issuer talks to the change-control system only through these traits,
//! so tests can swap in scripted transports and the HTTP stack lives in its
//! own crate.

use crate::error::Result;
use crate::types::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Type alias for async transport futures.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;

/// HTTP methods the transport can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    #[default]
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials attached to outbound requests.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// No authentication.
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Bearer token.
    Token {
        /// The token value.
        token: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
        }
    }
}

/// A resolved change-control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Full URL requests are sent to.
    pub url: String,
    /// Credentials for the endpoint.
    #[serde(default)]
    pub auth: Credentials,
}

impl Endpoint {
    /// Create an unauthenticated endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: Credentials::None,
        }
    }

    /// Use HTTP basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = Credentials::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Use a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Credentials::Token {
            token: token.into(),
        };
        self
    }
}

/// What came back from the change-control system.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body (`Null` when empty or not JSON).
    pub body: serde_json::Value,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401 or 403.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Sends change requests to the external system.
///
/// Implementations return `Err` only when no HTTP response was obtained
/// (connection refused, timeout, TLS). Any response, including 4xx/5xx, comes
/// back as `Ok` so the caller can normalize it.
pub trait ChangeTransport: Send + Sync {
    /// Send `payload` to `endpoint`.
    fn send<'a>(
        &'a self,
        method: HttpMethod,
        endpoint: &'a Endpoint,
        payload: &'a serde_json::Value,
    ) -> TransportFuture<'a>;
}

/// Maps a job to the endpoint its change requests go to.
pub trait EndpointResolver: Send + Sync {
    /// Resolve the endpoint for a job.
    ///
    /// # Errors
    /// [`GateError::EndpointNotConfigured`](crate::error::GateError::EndpointNotConfigured)
    /// when no endpoint applies.
    fn resolve(&self, job_id: &JobId) -> Result<Endpoint>;
}

/// A single endpoint serves every job.
impl EndpointResolver for Endpoint {
    fn resolve(&self, _job_id: &JobId) -> Result<Endpoint> {
        Ok(self.clone())
    }
}
