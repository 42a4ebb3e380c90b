//! Execution inspection and cancellation.

use crate::api::error::ApiError;
use crate::api::response;
use crate::api::state::AppState;
use bytes::Bytes;
use changegate_core::error::GateError;
use changegate_core::types::ExecutionId;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;

fn parse_id(raw: &str) -> Result<ExecutionId, ApiError> {
    ExecutionId::parse(raw)
        .ok_or_else(|| ApiError::bad_request("E000", format!("Invalid execution ID '{}'", raw)))
}

/// GET /api/v1/executions/{id}
pub async fn get(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    let execution_id = match parse_id(id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.orchestrator.execution(execution_id) {
        Some(record) => response::ok(&record),
        None => ApiError::from(GateError::ExecutionNotFound { execution_id }).into_response(),
    }
}

/// DELETE /api/v1/executions/{id}
///
/// Cancel the execution's pending waits and wake it with `Cancelled`.
pub async fn cancel(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    let execution_id = match parse_id(id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state
        .orchestrator
        .cancel_execution(execution_id, "cancelled via API")
    {
        Ok(tokens) => {
            tracing::info!(
                execution_id = %execution_id,
                cancelled = tokens.len(),
                "Execution cancelled via API"
            );
            let body = serde_json::json!({
                "execution_id": execution_id,
                "cancelled_tokens": tokens,
            });
            response::ok(&body)
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changegate_core::registry::PendingWait;
    use changegate_core::types::Token;
    use hyper::StatusCode;

    #[tokio::test]
    async fn invalid_id_is_bad_request() {
        let state = AppState::for_tests();
        assert_eq!(get(state, "not-a-uuid").await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_execution_is_not_found() {
        let state = AppState::for_tests();
        let id = ExecutionId::new().to_string();
        assert_eq!(cancel(state, &id).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cancel_removes_pending_wait() {
        let state = AppState::for_tests();
        let execution_id = ExecutionId::new();
        let token = Token::parse("T1_host").unwrap();
        state
            .registry
            .register(PendingWait::new(token.clone(), execution_id))
            .unwrap();

        let resp = cancel(Arc::clone(&state), &execution_id.to_string()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.registry.get(&token).is_none());
    }
}
