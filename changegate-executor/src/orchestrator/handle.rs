//! The suspended side of a wait.

use super::{Orchestrator, WaitOutcome, WaitSignal, WaitState};
use changegate_core::error::{GateError, Result};
use changegate_core::types::{ExecutionId, Token};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::Instrument;

/// A parked continuation for one wait.
///
/// Awaiting [`wait`](Self::wait) suspends the execution until a decision,
/// the deadline, or a cancellation. Dropping the handle before it completes
/// counts as the execution being aborted upstream: its pending waits are
/// cancelled in the registry.
#[must_use = "dropping a WaitHandle cancels the execution"]
pub struct WaitHandle {
    orchestrator: Arc<Orchestrator>,
    execution_id: ExecutionId,
    token: Token,
    deadline: Option<Instant>,
    serial: u64,
    rx: oneshot::Receiver<WaitSignal>,
    finished: bool,
}

impl WaitHandle {
    pub(super) fn new(
        orchestrator: Arc<Orchestrator>,
        execution_id: ExecutionId,
        token: Token,
        deadline: Option<Instant>,
        serial: u64,
        rx: oneshot::Receiver<WaitSignal>,
    ) -> Self {
        Self {
            orchestrator,
            execution_id,
            token,
            deadline,
            serial,
            rx,
            finished: false,
        }
    }

    /// Token the decision will arrive under.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// The suspended execution.
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// When the wait times out, if ever.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Suspend until the wait ends.
    ///
    /// # Errors
    /// `Cancelled` when the execution was cancelled or superseded, and
    /// `WaitAbandoned` if the orchestrator dropped the continuation.
    pub async fn wait(self) -> Result<WaitOutcome> {
        let span = crate::instrument_wait!(self.execution_id, self.token);
        self.park().instrument(span).await
    }

    async fn park(mut self) -> Result<WaitOutcome> {
        let mut timer_armed = self.deadline.is_some();
        let deadline = self.deadline.unwrap_or_else(Instant::now);

        loop {
            let received = tokio::select! {
                received = &mut self.rx => received,
                _ = tokio::time::sleep_until(deadline), if timer_armed => {
                    timer_armed = false;
                    self.orchestrator.on_deadline(&self.token);
                    continue;
                }
            };

            let signal = match received {
                Ok(signal) => signal,
                Err(_) => {
                    self.finished = true;
                    return Err(GateError::WaitAbandoned {
                        token: self.token.to_string(),
                    });
                }
            };

            match signal {
                WaitSignal::Decision(decision) => {
                    // Interim results never resolve a wait, and the sender is spent.
                    let Some(outcome) = WaitOutcome::from_decision(&decision) else {
                        self.finished = true;
                        return Err(GateError::WaitAbandoned {
                            token: self.token.to_string(),
                        });
                    };
                    self.orchestrator.registry().mark_delivered(&self.token);
                    self.complete(outcome.state());
                    tracing::info!(
                        token = %self.token,
                        execution_id = %self.execution_id,
                        result = %decision.result,
                        "Execution resumed"
                    );
                    return Ok(outcome);
                }
                WaitSignal::Expired => {
                    self.complete(WaitState::TimedOut);
                    return Ok(WaitOutcome::TimedOut);
                }
                WaitSignal::Cancelled(reason) => {
                    self.complete(WaitState::Aborted);
                    return Err(GateError::Cancelled {
                        execution_id: self.execution_id,
                        reason,
                    });
                }
            }
        }
    }

    fn complete(&mut self, state: WaitState) {
        self.finished = true;
        self.orchestrator.finish(self.execution_id, state);
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.orchestrator
                .abandon(self.execution_id, &self.token, self.serial);
        }
    }
}

impl std::fmt::Debug for WaitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitHandle")
            .field("execution_id", &self.execution_id)
            .field("token", &self.token)
            .field("deadline", &self.deadline)
            .finish()
    }
}
