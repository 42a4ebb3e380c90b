//! API client for a running changegate server.

use crate::error::{ClientError, Result};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A client for the changegate HTTP API.
///
/// # Example
///
/// ```no_run
/// use changegate_client::Client;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("http://localhost:8080")?
///     .with_timeout(Duration::from_secs(30))?;
///
/// let waits = client.list_waits().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    /// Base URL for the changegate server.
    base_url: String,
    /// HTTP client.
    http: HttpClient,
}

impl Client {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the server (e.g., "http://localhost:8080")
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();

        // Validate URL format
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base_url, http })
    }

    /// Set a custom timeout for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = HttpClient::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Build a full URL from a path.
    fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Execute a GET request.
    pub(crate) async fn get(&self, path: &str) -> Result<Response> {
        let url = self.url(path);
        let request = self.http.get(&url);

        request.send().await.map_err(ClientError::Http)
    }

    /// Execute a POST request with a raw body and content type.
    pub(crate) async fn post_raw(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<Response> {
        let url = self.url(path);
        let request = self
            .http
            .post(&url)
            .header("Content-Type", content_type)
            .body(body);

        request.send().await.map_err(ClientError::Http)
    }

    /// Execute a DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<Response> {
        let url = self.url(path);
        let request = self.http.delete(&url);

        request.send().await.map_err(ClientError::Http)
    }

    /// Handle a response and deserialize JSON.
    ///
    /// Non-success statuses become [`ClientError::Api`] with the message from
    /// the server's error envelope when one is present.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(ClientError::Deserialize);
        }

        Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    /// Like [`handle_response`](Self::handle_response), but 404 maps to `None`.
    pub(crate) async fn handle_optional<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<Option<T>> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }
}

/// Pull a message out of `{"error": {"message": ..}}`, `{"error": ".."}` or
/// `{"message": ..}`, falling back to the raw body.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    json["error"]["message"]
        .as_str()
        .or_else(|| json["error"].as_str())
        .or_else(|| json["message"].as_str())
        .unwrap_or(body)
        .to_string()
}
