//! Job-level view of the correlation registry.

use changegate_core::decision::CallbackDecision;
use changegate_core::registry::{CorrelationRegistry, WaitStatus};
use changegate_core::types::{JobId, Token};
use std::sync::Arc;

/// Answers "is this job waiting, and has its decision arrived?".
///
/// A job is tracked from the moment its wait is registered until the
/// decision has been collected, or the wait expired or was cancelled.
#[derive(Debug, Clone)]
pub struct JobTracker {
    registry: Arc<CorrelationRegistry>,
    tool_id: String,
}

impl JobTracker {
    /// Create a tracker minting tokens with the given tool prefix.
    pub fn new(registry: Arc<CorrelationRegistry>, tool_id: &str) -> Self {
        Self {
            registry,
            tool_id: tool_id.to_string(),
        }
    }

    /// Mint the token a job's next wait will be registered under.
    pub fn track_job(&self, job_id: &JobId) -> Token {
        let token = Token::mint(&self.tool_id, job_id);
        tracing::debug!(job_id = %job_id, token = %token, "Minted job token");
        token
    }

    /// Whether the job has a pending wait or an uncollected decision.
    pub fn is_tracked(&self, job_id: &JobId) -> bool {
        let Some(record) = self
            .registry
            .lookup_by_job(job_id)
            .and_then(|token| self.registry.get(&token))
        else {
            return false;
        };

        match record.status() {
            WaitStatus::Pending => true,
            WaitStatus::Resolved => !record.decision_delivered,
            WaitStatus::Expired | WaitStatus::Cancelled => false,
        }
    }

    /// The decision recorded for the job's current wait, if one arrived.
    pub fn pending_decision(&self, job_id: &JobId) -> Option<CallbackDecision> {
        self.registry.pending_decision(job_id)
    }

    /// The registry this tracker reads.
    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    /// Token currently tracked for the job.
    pub fn token_for(&self, job_id: &JobId) -> Option<Token> {
        self.registry.lookup_by_job(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changegate_core::decision::DecisionResult;
    use changegate_core::registry::PendingWait;
    use changegate_core::types::ExecutionId;

    #[test]
    fn tracks_until_decision_is_collected() {
        let registry = Arc::new(CorrelationRegistry::new());
        let tracker = JobTracker::new(Arc::clone(&registry), "T1");
        let job = JobId::new("J1");

        assert!(!tracker.is_tracked(&job));

        let token = tracker.track_job(&job);
        assert!(token.as_str().starts_with("T1_"));
        registry
            .register(PendingWait::new(token.clone(), ExecutionId::new()).for_job(job.clone()))
            .unwrap();
        assert!(tracker.is_tracked(&job));
        assert!(tracker.pending_decision(&job).is_none());

        registry.resolve(
            &token,
            CallbackDecision::new(token.clone(), DecisionResult::Rejected),
        );
        assert!(tracker.is_tracked(&job));
        assert_eq!(
            tracker.pending_decision(&job).map(|d| d.result),
            Some(DecisionResult::Rejected)
        );

        registry.take_decision(&token);
        assert!(!tracker.is_tracked(&job));
        assert_eq!(tracker.token_for(&job), Some(token));
    }

    #[test]
    fn minted_tokens_are_unique() {
        let tracker = JobTracker::new(Arc::new(CorrelationRegistry::new()), "T1");
        let job = JobId::new("J1");
        assert_ne!(tracker.track_job(&job), tracker.track_job(&job));
    }
}
