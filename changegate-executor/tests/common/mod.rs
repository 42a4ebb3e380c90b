//! Common test utilities for integration tests.

#![allow(dead_code)]

use changegate_core::error::{GateError, Result};
use changegate_core::registry::{CorrelationRegistry, RegistryStore};
use changegate_core::transport::{
    ChangeTransport, Endpoint, HttpMethod, TransportFuture, TransportResponse,
};
use changegate_core::types::Token;
use changegate_executor::api::AppState;
use changegate_executor::issuer::Issuer;
use changegate_executor::orchestrator::Orchestrator;
use changegate_executor::receiver::ReceiveStatus;
use changegate_executor::tracking::JobTracker;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;

/// Transport replaying queued outcomes, then plain successes.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<TransportResponse>>>,
    sent: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reply(&self, status: u16, body: serde_json::Value) {
        self.outcomes
            .lock()
            .push_back(Ok(TransportResponse::new(status, body)));
    }

    pub fn push_failure(&self, cause: &str) {
        self.outcomes.lock().push_back(Err(GateError::Network {
            cause: cause.to_string(),
        }));
    }

    pub fn sent(&self) -> Vec<serde_json::Value> {
        self.sent.lock().clone()
    }
}

impl ChangeTransport for ScriptedTransport {
    fn send<'a>(
        &'a self,
        _method: HttpMethod,
        _endpoint: &'a Endpoint,
        payload: &'a serde_json::Value,
    ) -> TransportFuture<'a> {
        self.sent.lock().push(payload.clone());
        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(TransportResponse::new(201, json!({"status": "success"}))));
        Box::pin(async move { outcome })
    }
}

/// A fully wired gate over one registry.
pub struct Harness {
    pub registry: Arc<CorrelationRegistry>,
    pub transport: Arc<ScriptedTransport>,
    pub orchestrator: Arc<Orchestrator>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(CorrelationRegistry::new()))
    }

    pub fn with_store(store: Arc<dyn RegistryStore>) -> Self {
        let registry = CorrelationRegistry::open(store).expect("registry opens");
        Self::with_registry(Arc::new(registry))
    }

    pub fn with_registry(registry: Arc<CorrelationRegistry>) -> Self {
        let transport = ScriptedTransport::new();
        let issuer = Issuer::new(
            Arc::clone(&transport) as Arc<dyn ChangeTransport>,
            Arc::new(Endpoint::new("https://cm.example.com/api/change")),
            Arc::clone(&registry),
        )
        .with_public_base_url("https://gate.example.com")
        .with_tool_id("T1");

        let orchestrator =
            Arc::new(Orchestrator::new(Arc::clone(&registry)).with_issuer(Arc::new(issuer)));
        let tracker = JobTracker::new(Arc::clone(&registry), "T1");
        let state = Arc::new(AppState::new(Arc::clone(&orchestrator), tracker));

        Self {
            registry,
            transport,
            orchestrator,
            state,
        }
    }

    /// Deliver a JSON callback body.
    pub fn deliver(&self, token: &Token, body: serde_json::Value) -> ReceiveStatus {
        self.state.receiver.receive(
            token.as_str(),
            body.to_string().as_bytes(),
            Some("application/json"),
        )
    }
}

/// Yield until `check` holds, failing after many rounds.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..1000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}
