//! Callback delivery and wait inspection.

use crate::api::error::ApiError;
use crate::api::request;
use crate::api::response;
use crate::api::state::AppState;
use crate::receiver::MAX_BODY_BYTES;
use bytes::Bytes;
use changegate_core::error::GateError;
use changegate_core::types::Token;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

/// POST /api/v1/callbacks/{token}
///
/// Deliver a decision. Answers 200 (accepted or duplicate), 202 (interim),
/// 400 (malformed), 404 (unknown, expired or cancelled) or 413.
pub async fn deliver<B>(req: Request<B>, state: Arc<AppState>, token: &str) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<request::BoxError>,
{
    let content_type = request::content_type(&req);
    let body = match request::read_body_limited(req, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(token = %token, error = %e, "Callback body rejected");
            return e.into_response();
        }
    };

    let status = state
        .receiver
        .receive(token, &body, content_type.as_deref());

    let code = StatusCode::from_u16(status.status_code()).unwrap_or(StatusCode::OK);
    response::json_response(code, &status)
}

/// GET /api/v1/callbacks/{token}
///
/// The full registry record for a token.
pub async fn inspect(state: Arc<AppState>, token: &str) -> Response<Full<Bytes>> {
    let token = match Token::parse(token) {
        Ok(t) => t,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.registry.get(&token) {
        Some(record) => response::ok(&record),
        None => ApiError::from(GateError::UnknownToken {
            token: token.to_string(),
        })
        .into_response(),
    }
}
