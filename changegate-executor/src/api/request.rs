//! Request body helpers.

use super::error::ApiError;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::Request;
use hyper::body::Body;

/// Boxed error used by request bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read the whole body, failing with 413 past `limit` bytes.
pub async fn read_body_limited<B>(req: Request<B>, limit: usize) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let body = req.into_body();
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::payload_too_large(limit))
        }
        Err(e) => Err(ApiError::bad_request(
            "E000",
            format!("Failed to read request body: {}", e),
        )),
    }
}

/// The request's `Content-Type`, if present and valid UTF-8.
pub fn content_type<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::StatusCode;

    #[tokio::test]
    async fn reads_small_bodies() {
        let req = Request::new(Full::new(Bytes::from_static(b"result=approved")));
        let bytes = read_body_limited(req, 64).await.unwrap();
        assert_eq!(&bytes[..], b"result=approved");
    }

    #[tokio::test]
    async fn rejects_oversized_bodies() {
        let req = Request::new(Full::new(Bytes::from(vec![b'x'; 65])));
        let err = read_body_limited(req, 64).await.unwrap_err();
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn extracts_content_type() {
        let req = Request::builder()
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(content_type(&req).as_deref(), Some("application/json"));
    }
}
