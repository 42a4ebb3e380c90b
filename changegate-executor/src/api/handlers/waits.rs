//! Pending wait listing.

use crate::api::response;
use crate::api::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;

/// GET /api/v1/waits
pub async fn list(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let waits = state.registry.list_pending();
    let body = serde_json::json!({
        "count": waits.len(),
        "waits": waits,
    });
    response::ok(&body)
}
