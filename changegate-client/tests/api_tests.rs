//! Client operations against a mocked changegate server.

use changegate_client::{Client, ClientError};
use changegate_core::types::ExecutionId;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_list_waits() {
    let mock_server = MockServer::start().await;
    let execution_id = ExecutionId::new();

    Mock::given(method("GET"))
        .and(path("/api/v1/waits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "waits": [{
                "token": "T1_abc_deploy",
                "execution_id": execution_id,
                "job_id": "deploy",
                "created_at": "2026-01-01T00:00:00Z",
                "expires_at": null,
                "status": "pending",
                "metadata": {}
            }]
        })))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let waits = client.list_waits().await.unwrap();

    assert_eq!(waits.len(), 1);
    assert_eq!(waits[0].token.as_str(), "T1_abc_deploy");
    assert_eq!(waits[0].execution_id, execution_id);
}

#[tokio::test]
async fn test_deliver_callback_reports() {
    let mock_server = MockServer::start().await;
    let execution_id = ExecutionId::new();

    Mock::given(method("POST"))
        .and(path("/api/v1/callbacks/T1_ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "accepted",
            "execution_id": execution_id,
            "result": "approved"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/callbacks/T1_gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": "not_found"})))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();

    let report = client
        .deliver_callback("T1_ok", &json!({"result": "approved"}))
        .await
        .unwrap();
    assert!(report.is_accepted());
    assert_eq!(report.execution_id, Some(execution_id));

    let report = client
        .deliver_callback("T1_gone", &json!({"result": "approved"}))
        .await
        .unwrap();
    assert_eq!(report.status, "not_found");
}

#[tokio::test]
async fn test_get_wait_unknown_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/callbacks/T1_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "E302", "message": "E302: Unknown token 'T1_missing'", "status": 404}
        })))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    assert!(client.get_wait("T1_missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_unknown_execution() {
    let mock_server = MockServer::start().await;
    let execution_id = ExecutionId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/executions/{}", execution_id)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "E402", "message": "E402: Execution not found", "status": 404}
        })))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    match client.cancel_execution(execution_id).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.contains("E402"));
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_job_decision() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/folder%2Fdeploy/decision"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "folder/deploy",
            "tracked": true,
            "token": "T1_abc_folder-deploy",
            "decision": null
        })))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let decision = client.job_decision("folder/deploy").await.unwrap();

    assert!(decision.tracked);
    assert!(decision.decision.is_none());
}

#[tokio::test]
async fn test_health() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "service": "changegate"
        })))
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    assert_eq!(client.health().await.unwrap().status, "healthy");
}
