//! Shared state for the API handlers.

use crate::orchestrator::Orchestrator;
use crate::receiver::CallbackReceiver;
use crate::tracking::JobTracker;
use changegate_core::registry::CorrelationRegistry;
use std::sync::Arc;
use std::time::Instant;

/// Everything a handler can reach.
#[derive(Debug)]
pub struct AppState {
    /// Correlation registry.
    pub registry: Arc<CorrelationRegistry>,
    /// Suspended executions.
    pub orchestrator: Arc<Orchestrator>,
    /// Inbound delivery handling.
    pub receiver: CallbackReceiver,
    /// Job-level queries.
    pub tracker: JobTracker,
    /// Server start time, for uptime.
    pub start_time: Instant,
}

impl AppState {
    /// Build state around an orchestrator and tracker sharing one registry.
    pub fn new(orchestrator: Arc<Orchestrator>, tracker: JobTracker) -> Self {
        Self {
            registry: Arc::clone(orchestrator.registry()),
            receiver: CallbackReceiver::new(Arc::clone(&orchestrator)),
            orchestrator,
            tracker,
            start_time: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
impl AppState {
    pub(crate) fn for_tests() -> Arc<Self> {
        let registry = Arc::new(CorrelationRegistry::new());
        let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&registry)));
        Arc::new(Self::new(orchestrator, JobTracker::new(registry, "test")))
    }
}
