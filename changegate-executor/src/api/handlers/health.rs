//! Health and status endpoint handlers.

use crate::api::response;
use crate::api::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;

/// GET /api/v1/health
///
/// Simple health check that returns 200 OK if the server is running.
pub async fn get_health(_state: Arc<AppState>) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "healthy",
        "service": "changegate"
    });

    response::ok(&body)
}

/// GET /api/v1/status
///
/// Uptime plus registry and orchestrator counts.
pub async fn get_status(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "running",
        "service": "changegate",
        "uptime_seconds": state.uptime_secs(),
        "registry": {
            "records": state.registry.len(),
            "pending": state.registry.pending_count()
        },
        "executions": {
            "waiting": state.orchestrator.waiting_count()
        }
    });

    response::ok(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[tokio::test]
    async fn health_check_returns_ok() {
        let response = get_health(AppState::for_tests()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_returns_system_info() {
        let response = get_status(AppState::for_tests()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
