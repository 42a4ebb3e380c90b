//! Request routing for the API.
//!
//! Routes requests to handlers based on method and path.

use super::handlers;
use super::request::BoxError;
use super::response;
use super::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Route prefix for all API endpoints.
const API_PREFIX: &str = "/api/v1";

/// Route an incoming request to the appropriate handler.
///
/// Generic over the body so tests can drive it with in-memory bodies.
pub async fn route<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    tracing::debug!(method = %method, path = %path, "Routing request");

    let Some(path) = path.strip_prefix(API_PREFIX) else {
        return Ok(response::not_found());
    };

    let response = match (method, path) {
        (Method::GET, "/health") => handlers::health::get_health(state).await,
        (Method::GET, "/status") => handlers::health::get_status(state).await,
        (_, "/health") | (_, "/status") => response::method_not_allowed(&["GET"]),

        (Method::GET, "/waits") => handlers::waits::list(state).await,
        (_, "/waits") => response::method_not_allowed(&["GET"]),

        (_, p) if p.starts_with("/callbacks/") => route_callback(req, state, p).await,
        (_, p) if p.starts_with("/jobs/") => route_job(req.method(), state, p).await,
        (_, p) if p.starts_with("/executions/") => route_execution(req.method(), state, p).await,

        _ => response::not_found(),
    };

    Ok(response)
}

/// Route requests under /callbacks/{token}
async fn route_callback<B>(
    req: Request<B>,
    state: Arc<AppState>,
    path: &str,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let token = path.strip_prefix("/callbacks/").unwrap_or("");
    if token.is_empty() || token.contains('/') {
        return response::not_found();
    }

    match *req.method() {
        Method::POST => handlers::callbacks::deliver(req, state, token).await,
        Method::GET => handlers::callbacks::inspect(state, token).await,
        _ => response::method_not_allowed(&["GET", "POST"]),
    }
}

/// Route requests under /jobs/{job}/decision
///
/// Job IDs may contain slashes, so the suffix is matched from the end and the
/// remainder percent-decoded.
async fn route_job(method: &Method, state: Arc<AppState>, path: &str) -> Response<Full<Bytes>> {
    let Some(raw_job) = path
        .strip_prefix("/jobs/")
        .and_then(|p| p.strip_suffix("/decision"))
        .filter(|j| !j.is_empty())
    else {
        return response::not_found();
    };

    let job = match urlencoding::decode(raw_job) {
        Ok(job) => job.into_owned(),
        Err(_) => return response::not_found(),
    };

    match *method {
        Method::GET => handlers::jobs::decision(state, &job).await,
        _ => response::method_not_allowed(&["GET"]),
    }
}

/// Route requests under /executions/{id}
async fn route_execution(
    method: &Method,
    state: Arc<AppState>,
    path: &str,
) -> Response<Full<Bytes>> {
    let id = path.strip_prefix("/executions/").unwrap_or("");
    if id.is_empty() || id.contains('/') {
        return response::not_found();
    }

    match *method {
        Method::GET => handlers::executions::get(state, id).await,
        Method::DELETE => handlers::executions::cancel(state, id).await,
        _ => response::method_not_allowed(&["GET", "DELETE"]),
    }
}
