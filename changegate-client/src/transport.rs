//! Outbound change-request transport over reqwest.

use crate::error::{ClientError, Result};
use changegate_core::transport::{
    ChangeTransport, Credentials, Endpoint, HttpMethod, TransportFuture, TransportResponse,
};
use reqwest::{Client as HttpClient, Method, RequestBuilder};
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ChangeTransport`] that sends JSON over HTTP(S).
///
/// Any HTTP response, whatever its status, is returned as a
/// [`TransportResponse`]; only connection-level failures are errors. Bodies
/// that are not JSON come back as `Null`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    fn request(&self, method: HttpMethod, endpoint: &Endpoint) -> RequestBuilder {
        let method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };
        let builder = self.http.request(method, &endpoint.url);

        match &endpoint.auth {
            Credentials::None => builder,
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Credentials::Token { token } => builder.bearer_auth(token),
        }
    }

    async fn send_json(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        payload: &serde_json::Value,
    ) -> Result<TransportResponse> {
        if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                endpoint.url
            )));
        }

        let mut request = self
            .request(method, endpoint)
            .header("Accept", "application/json");
        if method.has_body() {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

        tracing::debug!(
            method = %method,
            url = %endpoint.url,
            status,
            "Change-control response received"
        );

        Ok(TransportResponse::new(status, body))
    }
}

impl ChangeTransport for HttpTransport {
    fn send<'a>(
        &'a self,
        method: HttpMethod,
        endpoint: &'a Endpoint,
        payload: &'a serde_json::Value,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            self.send_json(method, endpoint, payload)
                .await
                .map_err(Into::into)
        })
    }
}
