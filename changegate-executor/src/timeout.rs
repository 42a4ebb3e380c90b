//! Background expiry for waits with no parked continuation.

use crate::orchestrator::Orchestrator;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Periodically expires overdue waits and sweeps tombstones.
///
/// Waits with a parked continuation time out on their own deadline timer;
/// this processor covers waits reloaded after a restart that nobody has
/// reattached yet, and keeps the registry from growing without bound.
pub struct TimeoutProcessor {
    orchestrator: Arc<Orchestrator>,
    check_interval: Duration,
    retention: Duration,
    running: AtomicBool,
    stop: Notify,
}

/// Counts from one processor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Waits moved to expired.
    pub expired: usize,
    /// Registry tombstones dropped.
    pub tombstones: usize,
    /// Finished execution records dropped.
    pub executions: usize,
}

impl TimeoutProcessor {
    /// Create a processor with a 1 s interval and 1 h retention.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            check_interval: Duration::from_secs(1),
            retention: Duration::from_secs(3600),
            running: AtomicBool::new(false),
            stop: Notify::new(),
        }
    }

    /// Set the check interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Set how long finished execution records are kept.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Check if the processor is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            interval_ms = self.check_interval.as_millis() as u64,
            "Timeout processor started"
        );

        while self.running.load(Ordering::SeqCst) {
            self.process();
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = self.stop.notified() => {}
            }
        }

        tracing::info!("Timeout processor stopped");
    }

    /// Run one pass.
    pub fn process(&self) -> SweepReport {
        let now = Utc::now();
        let report = SweepReport {
            expired: self.orchestrator.expire_overdue(now),
            tombstones: self.orchestrator.registry().sweep_tombstones(now),
            executions: self.orchestrator.sweep_finished(now, self.retention),
        };

        if report != SweepReport::default() {
            tracing::debug!(
                expired = report.expired,
                tombstones = report.tombstones,
                executions = report.executions,
                "Timeout processor pass"
            );
        }
        report
    }

    /// Stop the processor.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_one();
    }
}
