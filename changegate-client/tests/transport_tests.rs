//! HttpTransport against a mocked change-control endpoint.

use changegate_client::HttpTransport;
use changegate_core::transport::{ChangeTransport, Endpoint, HttpMethod};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_success_envelope_is_returned() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/change"))
        .and(body_json(json!({"job_id": "deploy"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "success",
            "token": "T1_remote"
        })))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let endpoint = Endpoint::new(format!("{}/api/change", mock_server.uri()));

    let response = transport
        .send(HttpMethod::Post, &endpoint, &json!({"job_id": "deploy"}))
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_success());
    assert_eq!(response.body["token"], "T1_remote");
}

#[tokio::test]
async fn test_error_statuses_are_responses_not_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "database unavailable"
        })))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let endpoint = Endpoint::new(mock_server.uri());

    let response = transport
        .send(HttpMethod::Post, &endpoint, &json!({}))
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.body["message"], "database unavailable");
}

#[tokio::test]
async fn test_unauthorized_with_non_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("<html>denied</html>"))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let endpoint = Endpoint::new(mock_server.uri());

    let response = transport
        .send(HttpMethod::Post, &endpoint, &json!({}))
        .await
        .unwrap();

    assert!(response.is_auth_failure());
    assert!(response.body.is_null());
}

#[tokio::test]
async fn test_basic_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Basic c3ZjOmh1bnRlcjI="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let endpoint = Endpoint::new(mock_server.uri()).with_basic_auth("svc", "hunter2");

    let response = transport
        .send(HttpMethod::Post, &endpoint, &json!({}))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_bearer_token_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(header("authorization", "Bearer s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let endpoint = Endpoint::new(mock_server.uri()).with_token("s3cr3t");

    let response = transport
        .send(HttpMethod::Put, &endpoint, &json!({}))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_connection_failure_is_an_error() {
    // Grab a free port, then close it so nothing is listening.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let transport = HttpTransport::new().unwrap();
    let endpoint = Endpoint::new(format!("http://{}/api/change", addr));

    let err = transport
        .send(HttpMethod::Post, &endpoint, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E902");
}
