//! Job-level decision lookup.

use crate::api::response;
use crate::api::state::AppState;
use bytes::Bytes;
use changegate_core::types::JobId;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;

/// GET /api/v1/jobs/{job}/decision
///
/// Always 200; `decision` is null until one has arrived.
pub async fn decision(state: Arc<AppState>, job: &str) -> Response<Full<Bytes>> {
    let job_id = JobId::new(job);
    let body = serde_json::json!({
        "job_id": job_id,
        "tracked": state.tracker.is_tracked(&job_id),
        "token": state.tracker.token_for(&job_id),
        "decision": state.tracker.pending_decision(&job_id),
    });
    response::ok(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use changegate_core::decision::{CallbackDecision, DecisionResult};
    use changegate_core::registry::PendingWait;
    use changegate_core::types::ExecutionId;
    use http_body_util::BodyExt;

    async fn json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn untracked_job_has_no_decision() {
        let state = AppState::for_tests();
        let body = json(decision(state, "folder/deploy").await).await;

        assert_eq!(body["tracked"], false);
        assert!(body["decision"].is_null());
    }

    #[tokio::test]
    async fn resolved_job_reports_decision() {
        let state = AppState::for_tests();
        let job = JobId::new("deploy");
        let token = state.tracker.track_job(&job);
        state
            .registry
            .register(PendingWait::new(token.clone(), ExecutionId::new()).for_job(job))
            .unwrap();
        state.registry.resolve(
            &token,
            CallbackDecision::new(token.clone(), DecisionResult::Rejected).with_comments("no"),
        );

        let body = json(decision(state, "deploy").await).await;
        assert_eq!(body["tracked"], true);
        assert_eq!(body["token"], token.as_str());
        assert_eq!(body["decision"]["result"], "rejected");
    }
}
