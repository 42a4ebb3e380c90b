//! Waits survive a restart through a persistent store.

mod common;

use changegate_core::registry::{FileRegistryStore, PendingWait, RegistryStore, WaitStatus};
use changegate_core::types::{ExecutionId, Token};
use changegate_executor::issuer::ChangeRequest;
use changegate_executor::orchestrator::WaitOutcome;
use changegate_executor::receiver::ReceiveStatus;
use changegate_executor::timeout::TimeoutProcessor;
use chrono::Utc;
use common::Harness;
use serde_json::json;
use std::sync::Arc;

fn file_store(dir: &tempfile::TempDir) -> Arc<dyn RegistryStore> {
    Arc::new(FileRegistryStore::open(dir.path().join("waits.json")).unwrap())
}

/// Submit and suspend, then lose the process without cleanup.
async fn crash_after_submit(dir: &tempfile::TempDir, execution_id: ExecutionId) -> Token {
    let gate = Harness::with_store(file_store(dir));
    let handle = gate
        .orchestrator
        .run(
            execution_id,
            &ChangeRequest::new("deploy-prod", "9", "Deploy build 9"),
        )
        .await
        .unwrap();
    let token = handle.token().clone();
    // A crash runs no destructors.
    std::mem::forget(handle);
    token
}

#[tokio::test]
async fn reattached_wait_receives_decision() {
    let dir = tempfile::tempdir().unwrap();
    let execution_id = ExecutionId::new();
    let token = crash_after_submit(&dir, execution_id).await;

    let gate = Harness::with_store(file_store(&dir));
    assert_eq!(gate.registry.pending_count(), 1);

    let handle = gate
        .orchestrator
        .reattach(execution_id, token.clone())
        .unwrap();
    let waiter = tokio::spawn(handle.wait());

    let status = gate.deliver(&token, json!({"result": "approved"}));
    assert!(matches!(status, ReceiveStatus::Accepted { .. }));
    assert!(waiter.await.unwrap().unwrap().is_approved());
}

#[tokio::test]
async fn decision_during_downtime_completes_on_reattach() {
    let dir = tempfile::tempdir().unwrap();
    let execution_id = ExecutionId::new();
    let token = crash_after_submit(&dir, execution_id).await;

    // The receiver comes back first and accepts the decision.
    let gate = Harness::with_store(file_store(&dir));
    let status = gate.deliver(&token, json!({"result": "rejected", "comments": "no"}));
    assert!(matches!(status, ReceiveStatus::Accepted { .. }));

    let outcome = gate
        .orchestrator
        .reattach(execution_id, token)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WaitOutcome::Rejected {
            comments: Some("no".into())
        }
    );
}

#[tokio::test]
async fn overdue_wait_is_expired_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let execution_id = ExecutionId::new();
    let token = Token::parse("T1_overdue").unwrap();
    {
        let gate = Harness::with_store(file_store(&dir));
        gate.registry
            .register(
                PendingWait::new(token.clone(), execution_id)
                    .with_expiry(Utc::now() - chrono::Duration::seconds(5)),
            )
            .unwrap();
    }

    let gate = Harness::with_store(file_store(&dir));
    let processor = TimeoutProcessor::new(Arc::clone(&gate.orchestrator));
    let report = processor.process();
    assert_eq!(report.expired, 1);
    assert_eq!(
        gate.registry.get(&token).unwrap().status(),
        WaitStatus::Expired
    );

    let outcome = gate
        .orchestrator
        .reattach(execution_id, token)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);
}

#[tokio::test]
async fn reattach_checks_ownership() {
    let dir = tempfile::tempdir().unwrap();
    let execution_id = ExecutionId::new();
    let token = crash_after_submit(&dir, execution_id).await;

    let gate = Harness::with_store(file_store(&dir));
    let err = gate
        .orchestrator
        .reattach(ExecutionId::new(), token)
        .unwrap_err();
    assert_eq!(err.code(), "E402");

    let err = gate
        .orchestrator
        .reattach(execution_id, Token::parse("T1_unknown").unwrap())
        .unwrap_err();
    assert_eq!(err.code(), "E302");
}
