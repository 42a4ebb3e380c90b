//! Wait/resume orchestration.
//!
//! An execution is suspended by parking a `oneshot` continuation keyed by its
//! token; nothing blocks a thread while the decision is outstanding. Every
//! path that wins a registry transition (callback, deadline, timeout sweep,
//! cancellation) wakes the continuation through [`Orchestrator::signal`], which
//! removes the waiter under the map lock, so each continuation is woken at most
//! once. Paths that lose a transition call `settle` to reconcile with
//! whatever the registry says happened.

mod handle;
mod state;

pub use handle::WaitHandle;
pub use state::{WaitOutcome, WaitState};

use crate::issuer::{ChangeRequest, Issuer};
use changegate_core::decision::CallbackDecision;
use changegate_core::error::{GateError, Result};
use changegate_core::registry::{CorrelationRegistry, Resolution, WaitStatus};
use changegate_core::types::{ExecutionId, JobId, Token};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Message that wakes a parked continuation.
#[derive(Debug)]
pub(crate) enum WaitSignal {
    /// A terminal decision arrived.
    Decision(CallbackDecision),
    /// The deadline passed.
    Expired,
    /// The execution was cancelled or the wait disappeared.
    Cancelled(String),
}

struct Waiter {
    serial: u64,
    execution_id: ExecutionId,
    tx: oneshot::Sender<WaitSignal>,
}

/// What the orchestrator knows about one execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    /// The execution.
    pub execution_id: ExecutionId,
    /// Current state.
    pub state: WaitState,
    /// Token of the current wait, once registered.
    pub token: Option<Token>,
    /// Job the execution gates.
    pub job_id: Option<JobId>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    fn new(execution_id: ExecutionId, job_id: Option<JobId>) -> Self {
        Self {
            execution_id,
            state: WaitState::Submitting,
            token: None,
            job_id,
            updated_at: Utc::now(),
        }
    }
}

/// Suspends executions on pending waits and resumes them with an outcome.
pub struct Orchestrator {
    registry: Arc<CorrelationRegistry>,
    issuer: Option<Arc<Issuer>>,
    waiters: Mutex<HashMap<Token, Waiter>>,
    executions: RwLock<HashMap<ExecutionId, ExecutionRecord>>,
    next_serial: AtomicU64,
}

impl Orchestrator {
    /// Create an orchestrator over a registry.
    pub fn new(registry: Arc<CorrelationRegistry>) -> Self {
        Self {
            registry,
            issuer: None,
            waiters: Mutex::new(HashMap::new()),
            executions: RwLock::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Attach the issuer used by [`run`](Self::run).
    pub fn with_issuer(mut self, issuer: Arc<Issuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// The registry this orchestrator resolves against.
    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    /// Submit a change request and suspend `execution_id` on its decision.
    ///
    /// Submission failures put the execution in `CommFailure` and are
    /// returned here, before any wait exists.
    pub async fn run(
        self: &Arc<Self>,
        execution_id: ExecutionId,
        request: &ChangeRequest,
    ) -> Result<WaitHandle> {
        let issuer = self.issuer.clone().ok_or_else(|| GateError::ConfigValue {
            field: "issuer".to_string(),
            cause: "orchestrator has no issuer attached".to_string(),
        })?;

        self.executions.write().insert(
            execution_id,
            ExecutionRecord::new(execution_id, Some(request.job_id.clone())),
        );

        let submission = match issuer.submit(execution_id, request).await {
            Ok(submission) => submission,
            Err(e) => {
                self.transition(execution_id, WaitState::CommFailure, None);
                tracing::warn!(
                    execution_id = %execution_id,
                    job_id = %request.job_id,
                    code = e.code(),
                    error = %e,
                    "Change request submission failed"
                );
                return Err(e);
            }
        };

        if let Some((token, owner)) = &submission.registration.superseded {
            self.signal(
                token,
                WaitSignal::Cancelled("superseded by a newer change request for the job".into()),
            );
            self.transition(*owner, WaitState::Aborted, None);
        }

        if self.state(execution_id) == Some(WaitState::Aborted) {
            self.registry.cancel(&execution_id);
            return Err(GateError::Cancelled {
                execution_id,
                reason: "cancelled during submission".to_string(),
            });
        }

        let deadline = submission
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        Ok(self.attach(execution_id, submission.token, deadline))
    }

    /// Park a continuation for an already registered wait.
    ///
    /// If the wait finished before the continuation was parked, the handle
    /// completes immediately with that result.
    pub fn attach(
        self: &Arc<Self>,
        execution_id: ExecutionId,
        token: Token,
        deadline: Option<Instant>,
    ) -> WaitHandle {
        let (tx, rx) = oneshot::channel();
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);

        let replaced = self.waiters.lock().insert(
            token.clone(),
            Waiter {
                serial,
                execution_id,
                tx,
            },
        );
        if replaced.is_some() {
            tracing::warn!(token = %token, "Replaced an existing continuation for token");
        }

        self.transition(execution_id, WaitState::Waiting, Some(&token));
        tracing::debug!(token = %token, execution_id = %execution_id, "Execution suspended");

        self.settle(&token);

        WaitHandle::new(Arc::clone(self), execution_id, token, deadline, serial, rx)
    }

    /// Re-park a continuation for a wait reloaded after a restart.
    ///
    /// The remaining time until the persisted deadline is honoured.
    ///
    /// # Errors
    /// `UnknownToken` if the registry has no record; `ExecutionNotFound` if
    /// the record belongs to another execution.
    pub fn reattach(
        self: &Arc<Self>,
        execution_id: ExecutionId,
        token: Token,
    ) -> Result<WaitHandle> {
        let record = self
            .registry
            .get(&token)
            .ok_or_else(|| GateError::UnknownToken {
                token: token.to_string(),
            })?;

        if record.wait.execution_id != execution_id {
            return Err(GateError::ExecutionNotFound { execution_id });
        }

        let deadline = record.wait.expires_at.map(|_| {
            Instant::now() + record.wait.time_until_expiry().unwrap_or(Duration::ZERO)
        });

        self.executions
            .write()
            .entry(execution_id)
            .or_insert_with(|| ExecutionRecord::new(execution_id, record.wait.job_id.clone()));

        tracing::info!(token = %token, execution_id = %execution_id, "Reattaching wait");
        Ok(self.attach(execution_id, token, deadline))
    }

    /// Hand a resolved decision to its parked continuation.
    ///
    /// Returns false when no continuation is parked; the decision then stays
    /// in the registry for a later `attach` or `pending_decision` lookup. The
    /// registry marks the decision delivered only once the handle reads it.
    pub fn deliver(&self, token: &Token, decision: CallbackDecision) -> bool {
        self.signal(token, WaitSignal::Decision(decision))
    }

    /// Cancel an execution: drop its pending waits and wake it as aborted.
    ///
    /// Cancelling twice, or after the decision arrived, is a no-op.
    ///
    /// # Errors
    /// `ExecutionNotFound` if neither the orchestrator nor the registry knows
    /// the execution.
    pub fn cancel_execution(&self, execution_id: ExecutionId, reason: &str) -> Result<Vec<Token>> {
        let tokens = self.registry.cancel(&execution_id);
        for token in &tokens {
            self.signal(token, WaitSignal::Cancelled(reason.to_string()));
        }

        let known = {
            let mut executions = self.executions.write();
            match executions.get_mut(&execution_id) {
                Some(record) => {
                    if record.state == WaitState::Submitting
                        || (!tokens.is_empty() && !record.state.is_terminal())
                    {
                        record.state = WaitState::Aborted;
                        record.updated_at = Utc::now();
                    }
                    true
                }
                None if !tokens.is_empty() => {
                    let mut record = ExecutionRecord::new(execution_id, None);
                    record.state = WaitState::Aborted;
                    record.token = tokens.first().cloned();
                    executions.insert(execution_id, record);
                    true
                }
                None => false,
            }
        };

        if !known {
            return Err(GateError::ExecutionNotFound { execution_id });
        }

        tracing::info!(
            execution_id = %execution_id,
            tokens = tokens.len(),
            reason = %reason,
            "Execution cancelled"
        );
        Ok(tokens)
    }

    /// Expire overdue waits that have no parked continuation.
    ///
    /// Waits with a continuation are expired by their own deadline timer.
    /// Returns how many waits were expired.
    pub fn expire_overdue(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for token in self.registry.expired_tokens(now) {
            if self.has_waiter(&token) {
                continue;
            }
            if let Resolution::Expired { execution_id } = self.registry.expire(&token) {
                expired += 1;
                self.signal(&token, WaitSignal::Expired);
                self.transition_known(execution_id, WaitState::TimedOut);
            }
        }
        expired
    }

    /// Drop finished execution records older than `ttl`.
    pub fn sweep_finished(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut executions = self.executions.write();
        let before = executions.len();
        executions.retain(|_, record| {
            !record.state.is_terminal()
                || (now - record.updated_at)
                    .to_std()
                    .map(|age| age < ttl)
                    .unwrap_or(true)
        });
        before - executions.len()
    }

    /// Current state of an execution.
    pub fn state(&self, execution_id: ExecutionId) -> Option<WaitState> {
        self.executions.read().get(&execution_id).map(|r| r.state)
    }

    /// Snapshot of an execution.
    pub fn execution(&self, execution_id: ExecutionId) -> Option<ExecutionRecord> {
        self.executions.read().get(&execution_id).cloned()
    }

    /// Whether a continuation is parked on the token.
    pub fn has_waiter(&self, token: &Token) -> bool {
        self.waiters.lock().contains_key(token)
    }

    /// Number of parked continuations.
    pub fn waiting_count(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Wake the continuation parked on `token`, if any.
    pub(crate) fn signal(&self, token: &Token, signal: WaitSignal) -> bool {
        let Some(waiter) = self.waiters.lock().remove(token) else {
            return false;
        };
        let sent = waiter.tx.send(signal).is_ok();
        if !sent {
            tracing::debug!(
                token = %token,
                execution_id = %waiter.execution_id,
                "Continuation was gone before it could be woken"
            );
        }
        sent
    }

    /// Called when a handle's deadline passes.
    pub(crate) fn on_deadline(&self, token: &Token) {
        match self.registry.expire(token) {
            Resolution::Expired { execution_id } => {
                tracing::info!(token = %token, execution_id = %execution_id, "Wait timed out");
                self.signal(token, WaitSignal::Expired);
            }
            other => {
                tracing::debug!(
                    token = %token,
                    outcome = ?other,
                    "Deadline lost to another resolution"
                );
                self.settle(token);
            }
        }
    }

    /// Called when a handle is dropped before completing.
    ///
    /// A signal already in flight to the handle is lost with it; the decision
    /// stays undelivered in the registry and the execution ends `Aborted`.
    pub(crate) fn abandon(&self, execution_id: ExecutionId, token: &Token, serial: u64) {
        let parked = {
            let mut waiters = self.waiters.lock();
            if waiters.get(token).is_some_and(|w| w.serial == serial) {
                waiters.remove(token);
                true
            } else {
                false
            }
        };
        tracing::warn!(
            token = %token,
            execution_id = %execution_id,
            parked,
            "Wait abandoned before completion; cancelling execution"
        );
        if let Err(e) = self.cancel_execution(execution_id, "wait handle dropped") {
            tracing::debug!(execution_id = %execution_id, error = %e, "Nothing to cancel");
        }
        self.transition_known(execution_id, WaitState::Aborted);
    }

    /// Record a terminal state reached by a handle.
    pub(crate) fn finish(&self, execution_id: ExecutionId, state: WaitState) {
        self.transition(execution_id, state, None);
    }

    /// Reconcile a parked continuation with the registry's view of its wait.
    fn settle(&self, token: &Token) {
        let Some(record) = self.registry.get(token) else {
            self.signal(
                token,
                WaitSignal::Cancelled("wait is no longer registered".into()),
            );
            return;
        };

        match record.status() {
            WaitStatus::Pending => {}
            WaitStatus::Resolved => {
                if let Some(decision) = self.registry.take_decision(token).or(record.decision) {
                    self.signal(token, WaitSignal::Decision(decision));
                }
            }
            WaitStatus::Expired => {
                self.signal(token, WaitSignal::Expired);
            }
            WaitStatus::Cancelled => {
                self.signal(token, WaitSignal::Cancelled("wait was cancelled".into()));
            }
        }
    }

    /// Move an execution to `state` unless it already finished.
    fn transition(
        &self,
        execution_id: ExecutionId,
        state: WaitState,
        token: Option<&Token>,
    ) -> bool {
        let mut executions = self.executions.write();
        let record = executions
            .entry(execution_id)
            .or_insert_with(|| ExecutionRecord::new(execution_id, None));

        if record.state.is_terminal() {
            return false;
        }
        record.state = state;
        record.updated_at = Utc::now();
        if let Some(token) = token {
            record.token = Some(token.clone());
        }
        true
    }

    fn transition_known(&self, execution_id: ExecutionId, state: WaitState) {
        let mut executions = self.executions.write();
        if let Some(record) = executions.get_mut(&execution_id) {
            if !record.state.is_terminal() {
                record.state = state;
                record.updated_at = Utc::now();
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("waiting", &self.waiting_count())
            .field("executions", &self.executions.read().len())
            .finish()
    }
}
