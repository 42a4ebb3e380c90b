//! The correlation registry: token -> pending wait, job -> token.

use super::record::{PendingWait, WaitRecord, WaitStatus};
use super::store::{MemoryRegistryStore, RegistryStore};
use crate::decision::CallbackDecision;
use crate::error::{GateError, Result};
use crate::types::{ExecutionId, JobId, Token};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default retention for resolved/expired tombstones.
pub const DEFAULT_TOMBSTONE_TTL: Duration = Duration::from_secs(3600);

type Entry = Arc<Mutex<WaitRecord>>;

/// Result of a status transition attempt on one token.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// PENDING -> RESOLVED; the decision must be handed to the owner.
    Resolved {
        /// The owning execution.
        execution_id: ExecutionId,
        /// The decision that won.
        decision: CallbackDecision,
    },
    /// PENDING -> EXPIRED.
    Expired {
        /// The owning execution.
        execution_id: ExecutionId,
    },
    /// An interim update was recorded; the wait stays PENDING.
    Updated {
        /// The owning execution.
        execution_id: ExecutionId,
    },
    /// The wait already reached a terminal status.
    AlreadyResolved {
        /// The status it reached first.
        status: WaitStatus,
    },
    /// No live record for the token.
    NotFound,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterOutcome {
    /// A still-pending wait for the same job that was cancelled in favour of
    /// this one: `(token, owner)`.
    pub superseded: Option<(Token, ExecutionId)>,
}

/// Point-in-time view of one record.
pub type WaitSnapshot = WaitRecord;

/// Injectable registry mapping tokens to pending waits.
///
/// Lock discipline: the map locks (`entries`, then `jobs`, then `aliases`) may
/// be taken before a record's own mutex, never after it. Status transitions on
/// one token run under that token's mutex only, so different tokens never
/// contend beyond the brief map lookup. Persistence happens inside the
/// transition: with [`FileRegistryStore`](super::FileRegistryStore) every
/// transition rewrites the snapshot under the store's mutex, which serializes
/// writers across tokens for the duration of that write.
///
/// A wait may carry an alias token; lookups by the alias reach the same record
/// and [`canonical`](Self::canonical) maps it back to the registered token.
///
/// Re-tracking policy: registering a wait for a job that still has a pending
/// wait cancels the older wait and reports it in [`RegisterOutcome`].
pub struct CorrelationRegistry {
    entries: RwLock<HashMap<Token, Entry>>,
    jobs: RwLock<HashMap<JobId, Token>>,
    aliases: RwLock<HashMap<Token, Token>>,
    store: Arc<dyn RegistryStore>,
    tombstone_ttl: Duration,
}

impl CorrelationRegistry {
    /// Create an empty registry backed by memory only.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            jobs: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            store: Arc::new(MemoryRegistryStore::new()),
            tombstone_ttl: DEFAULT_TOMBSTONE_TTL,
        }
    }

    /// Open a registry over a store, reloading every persisted record.
    pub fn open(store: Arc<dyn RegistryStore>) -> Result<Self> {
        let records = store.load()?;
        let mut entries = HashMap::with_capacity(records.len());
        let mut jobs = HashMap::new();
        let mut aliases = HashMap::new();

        for record in records {
            if record.status() == WaitStatus::Cancelled {
                store.delete(&record.wait.token)?;
                continue;
            }
            if let Some(job) = &record.wait.job_id {
                let newer = jobs
                    .get(job)
                    .and_then(|t: &Token| entries.get(t))
                    .map(|e: &Entry| e.lock().wait.created_at < record.wait.created_at)
                    .unwrap_or(true);
                if newer {
                    jobs.insert(job.clone(), record.wait.token.clone());
                }
            }
            if let Some(alias) = &record.wait.alias {
                aliases.insert(alias.clone(), record.wait.token.clone());
            }
            entries.insert(record.wait.token.clone(), Arc::new(Mutex::new(record)));
        }

        tracing::info!(
            store = store.name(),
            records = entries.len(),
            "Correlation registry opened"
        );

        Ok(Self {
            entries: RwLock::new(entries),
            jobs: RwLock::new(jobs),
            aliases: RwLock::new(aliases),
            store,
            tombstone_ttl: DEFAULT_TOMBSTONE_TTL,
        })
    }

    /// Set how long resolved and expired records are retained.
    pub fn with_tombstone_ttl(mut self, ttl: Duration) -> Self {
        self.tombstone_ttl = ttl;
        self
    }

    /// Register a pending wait.
    ///
    /// # Errors
    /// [`GateError::DuplicateToken`] if the token is already pending, or a
    /// store error if the record could not be persisted.
    pub fn register(&self, wait: PendingWait) -> Result<RegisterOutcome> {
        let token = wait.token.clone();
        let alias = wait.alias.clone().filter(|a| *a != token);
        let job_id = wait.job_id.clone();
        let execution_id = wait.execution_id;
        let mut record = WaitRecord::new(wait);
        record.wait.status = WaitStatus::Pending;

        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(&token) {
            if existing.lock().status() == WaitStatus::Pending {
                return Err(GateError::DuplicateToken {
                    token: token.to_string(),
                });
            }
        }

        self.store.put(&record)?;
        entries.insert(token.clone(), Arc::new(Mutex::new(record)));

        let mut outcome = RegisterOutcome::default();
        if let Some(job) = job_id {
            let previous = self.jobs.write().insert(job.clone(), token.clone());
            if let Some(prev_token) = previous.filter(|t| *t != token) {
                if let Some(prev) = entries.get(&prev_token).cloned() {
                    let mut prev = prev.lock();
                    if prev.status() == WaitStatus::Pending {
                        prev.finish(WaitStatus::Cancelled, Utc::now());
                        let owner = prev.wait.execution_id;
                        drop(prev);
                        entries.remove(&prev_token);
                        self.persist_delete(&prev_token);
                        self.drop_aliases(std::slice::from_ref(&prev_token));
                        tracing::warn!(
                            job_id = %job,
                            token = %prev_token,
                            execution_id = %owner,
                            "Pending wait superseded by re-tracked job"
                        );
                        outcome.superseded = Some((prev_token, owner));
                    }
                }
            }
        }

        if let Some(alias) = alias {
            tracing::debug!(token = %token, alias = %alias, "Wait reachable through alias");
            self.aliases.write().insert(alias, token.clone());
        }

        tracing::info!(token = %token, execution_id = %execution_id, "Wait registered");
        Ok(outcome)
    }

    /// Deliver a terminal decision.
    ///
    /// Interim decisions (`pending`) are recorded as updates and leave the wait
    /// open; see [`note_update`](Self::note_update).
    pub fn resolve(&self, token: &Token, decision: CallbackDecision) -> Resolution {
        if !decision.result.is_terminal() {
            return self.note_update(token, decision);
        }
        let Some(entry) = self.entry(token) else {
            return Resolution::NotFound;
        };

        let mut record = entry.lock();
        match record.status() {
            WaitStatus::Pending => {
                record.finish(WaitStatus::Resolved, decision.received_at);
                record.decision = Some(decision.clone());
                self.persist(&record);
                tracing::info!(
                    token = %token,
                    execution_id = %record.wait.execution_id,
                    result = %decision.result,
                    "Wait resolved"
                );
                Resolution::Resolved {
                    execution_id: record.wait.execution_id,
                    decision,
                }
            }
            WaitStatus::Cancelled => Resolution::NotFound,
            status => Resolution::AlreadyResolved { status },
        }
    }

    /// Record an interim update without resolving the wait.
    pub fn note_update(&self, token: &Token, update: CallbackDecision) -> Resolution {
        let Some(entry) = self.entry(token) else {
            return Resolution::NotFound;
        };

        let mut record = entry.lock();
        match record.status() {
            WaitStatus::Pending => {
                record.last_update = Some(update);
                self.persist(&record);
                Resolution::Updated {
                    execution_id: record.wait.execution_id,
                }
            }
            WaitStatus::Cancelled => Resolution::NotFound,
            status => Resolution::AlreadyResolved { status },
        }
    }

    /// Expire a pending wait. No-op if it already reached a terminal status.
    pub fn expire(&self, token: &Token) -> Resolution {
        let Some(entry) = self.entry(token) else {
            return Resolution::NotFound;
        };

        let mut record = entry.lock();
        match record.status() {
            WaitStatus::Pending => {
                record.finish(WaitStatus::Expired, Utc::now());
                self.persist(&record);
                tracing::info!(
                    token = %token,
                    execution_id = %record.wait.execution_id,
                    "Wait expired"
                );
                Resolution::Expired {
                    execution_id: record.wait.execution_id,
                }
            }
            WaitStatus::Cancelled => Resolution::NotFound,
            status => Resolution::AlreadyResolved { status },
        }
    }

    /// Remove every pending wait owned by an execution.
    ///
    /// Resolved and expired records are left alone, so cancelling after the
    /// decision arrived is a no-op. Returns the tokens that were removed.
    pub fn cancel(&self, execution_id: &ExecutionId) -> Vec<Token> {
        let mut entries = self.entries.write();
        let now = Utc::now();

        let mut removed = Vec::new();
        for (token, entry) in entries.iter() {
            let mut record = entry.lock();
            if record.wait.execution_id == *execution_id && record.status() == WaitStatus::Pending
            {
                record.finish(WaitStatus::Cancelled, now);
                removed.push(token.clone());
            }
        }

        for token in &removed {
            entries.remove(token);
            self.persist_delete(token);
        }
        if !removed.is_empty() {
            self.jobs.write().retain(|_, t| !removed.contains(t));
            self.drop_aliases(&removed);
            tracing::info!(
                execution_id = %execution_id,
                tokens = removed.len(),
                "Pending waits cancelled"
            );
        }
        removed
    }

    /// Remove a record outright, whatever its status.
    pub fn remove(&self, token: &Token) -> Option<WaitSnapshot> {
        let entry = self.entries.write().remove(token)?;
        self.jobs.write().retain(|_, t| t != token);
        self.drop_aliases(std::slice::from_ref(token));
        self.persist_delete(token);
        let record = entry.lock().clone();
        Some(record)
    }

    /// Find the owner of a live (pending or tombstoned) token.
    pub fn lookup_by_token(&self, token: &Token) -> Option<ExecutionId> {
        self.entry(token).map(|e| e.lock().wait.execution_id)
    }

    /// Find the token currently tracked for a job.
    pub fn lookup_by_job(&self, job_id: &JobId) -> Option<Token> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Snapshot a record.
    pub fn get(&self, token: &Token) -> Option<WaitSnapshot> {
        self.entry(token).map(|e| e.lock().clone())
    }

    /// Peek at the decision recorded for a job's current token.
    pub fn pending_decision(&self, job_id: &JobId) -> Option<CallbackDecision> {
        let token = self.lookup_by_job(job_id)?;
        self.entry(&token)?.lock().decision.clone()
    }

    /// Hand over a recorded decision that has not been delivered yet.
    ///
    /// Used when a continuation attaches after the decision arrived (races
    /// with registration, or a restart). Returns `None` once delivered.
    pub fn take_decision(&self, token: &Token) -> Option<CallbackDecision> {
        let entry = self.entry(token)?;
        let mut record = entry.lock();
        if record.decision_delivered {
            return None;
        }
        let decision = record.decision.clone()?;
        record.decision_delivered = true;
        self.persist(&record);
        Some(decision)
    }

    /// Mark a decision as handed to its owner.
    pub fn mark_delivered(&self, token: &Token) {
        if let Some(entry) = self.entry(token) {
            let mut record = entry.lock();
            if record.decision.is_some() && !record.decision_delivered {
                record.decision_delivered = true;
                self.persist(&record);
            }
        }
    }

    /// All waits still pending.
    pub fn list_pending(&self) -> Vec<PendingWait> {
        self.entries
            .read()
            .values()
            .filter_map(|e| {
                let record = e.lock();
                (record.status() == WaitStatus::Pending).then(|| record.wait.clone())
            })
            .collect()
    }

    /// Tokens of pending waits whose deadline passed at `now`.
    pub fn expired_tokens(&self, now: DateTime<Utc>) -> Vec<Token> {
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| {
                let record = e.lock();
                record.status() == WaitStatus::Pending && record.wait.is_expired_at(now)
            })
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Drop tombstones older than the retention window. Returns the count.
    pub fn sweep_tombstones(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let stale: Vec<Token> = entries
            .iter()
            .filter(|(_, e)| {
                let record = e.lock();
                record.status().is_terminal()
                    && record
                        .finished_at
                        .and_then(|at| (now - at).to_std().ok())
                        .is_some_and(|age| age >= self.tombstone_ttl)
            })
            .map(|(t, _)| t.clone())
            .collect();

        for token in &stale {
            entries.remove(token);
            self.persist_delete(token);
        }
        if !stale.is_empty() {
            self.jobs.write().retain(|_, t| !stale.contains(t));
            self.drop_aliases(&stale);
            tracing::debug!(count = stale.len(), "Swept registry tombstones");
        }
        stale.len()
    }

    /// Number of pending waits.
    pub fn pending_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| e.lock().status() == WaitStatus::Pending)
            .count()
    }

    /// Number of records, tombstones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The registered token for `token`, resolving aliases.
    pub fn canonical(&self, token: &Token) -> Token {
        if self.entries.read().contains_key(token) {
            return token.clone();
        }
        self.aliases
            .read()
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.clone())
    }

    fn entry(&self, token: &Token) -> Option<Entry> {
        if let Some(entry) = self.entries.read().get(token) {
            return Some(Arc::clone(entry));
        }
        let target = self.aliases.read().get(token).cloned()?;
        self.entries.read().get(&target).cloned()
    }

    fn drop_aliases(&self, tokens: &[Token]) {
        self.aliases.write().retain(|_, t| !tokens.contains(t));
    }

    fn persist(&self, record: &WaitRecord) {
        if let Err(e) = self.store.put(record) {
            tracing::error!(
                token = %record.wait.token,
                store = self.store.name(),
                error = %e,
                "Failed to persist wait record"
            );
        }
    }

    fn persist_delete(&self, token: &Token) {
        if let Err(e) = self.store.delete(token) {
            tracing::error!(
                token = %token,
                store = self.store.name(),
                error = %e,
                "Failed to delete wait record"
            );
        }
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("records", &self.len())
            .field("store", &self.store.name())
            .field("tombstone_ttl", &self.tombstone_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionResult;

    fn token(s: &str) -> Token {
        Token::parse(s).unwrap()
    }

    fn approve(t: &str) -> CallbackDecision {
        CallbackDecision::new(token(t), DecisionResult::Approved)
    }

    #[test]
    fn register_and_lookup() {
        let registry = CorrelationRegistry::new();
        let exec = ExecutionId::new();
        let job = JobId::new("J1");

        registry
            .register(PendingWait::new(token("T1_host"), exec).for_job(job.clone()))
            .unwrap();

        assert_eq!(registry.lookup_by_token(&token("T1_host")), Some(exec));
        assert_eq!(registry.lookup_by_job(&job), Some(token("T1_host")));
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn duplicate_pending_token_fails() {
        let registry = CorrelationRegistry::new();
        registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()))
            .unwrap();

        let err = registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()))
            .unwrap_err();
        assert_eq!(err.code(), "E101");
    }

    #[test]
    fn second_resolve_reports_already_resolved() {
        let registry = CorrelationRegistry::new();
        let exec = ExecutionId::new();
        registry
            .register(PendingWait::new(token("T1_host"), exec))
            .unwrap();

        match registry.resolve(&token("T1_host"), approve("T1_host")) {
            Resolution::Resolved { execution_id, .. } => assert_eq!(execution_id, exec),
            other => panic!("expected Resolved, got {:?}", other),
        }
        assert_eq!(
            registry.resolve(&token("T1_host"), approve("T1_host")),
            Resolution::AlreadyResolved {
                status: WaitStatus::Resolved
            }
        );
    }

    #[test]
    fn resolve_unknown_token_is_not_found() {
        let registry = CorrelationRegistry::new();
        assert_eq!(
            registry.resolve(&token("nope"), approve("nope")),
            Resolution::NotFound
        );
    }

    #[test]
    fn expire_does_not_override_resolution() {
        let registry = CorrelationRegistry::new();
        registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()))
            .unwrap();

        assert!(matches!(
            registry.resolve(&token("T1_host"), approve("T1_host")),
            Resolution::Resolved { .. }
        ));
        assert_eq!(
            registry.expire(&token("T1_host")),
            Resolution::AlreadyResolved {
                status: WaitStatus::Resolved
            }
        );
    }

    #[test]
    fn resolution_does_not_override_expiry() {
        let registry = CorrelationRegistry::new();
        registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()))
            .unwrap();

        assert!(matches!(
            registry.expire(&token("T1_host")),
            Resolution::Expired { .. }
        ));
        assert_eq!(
            registry.resolve(&token("T1_host"), approve("T1_host")),
            Resolution::AlreadyResolved {
                status: WaitStatus::Expired
            }
        );
    }

    #[test]
    fn interim_update_keeps_wait_pending() {
        let registry = CorrelationRegistry::new();
        registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()))
            .unwrap();

        let update = CallbackDecision::new(token("T1_host"), DecisionResult::Pending)
            .with_comments("awaiting CAB");
        assert!(matches!(
            registry.resolve(&token("T1_host"), update),
            Resolution::Updated { .. }
        ));

        let snapshot = registry.get(&token("T1_host")).unwrap();
        assert_eq!(snapshot.status(), WaitStatus::Pending);
        assert_eq!(
            snapshot.last_update.unwrap().comments.as_deref(),
            Some("awaiting CAB")
        );
    }

    #[test]
    fn cancel_removes_pending_and_is_idempotent() {
        let registry = CorrelationRegistry::new();
        let exec = ExecutionId::new();
        let job = JobId::new("J2");
        registry
            .register(PendingWait::new(token("T5_host"), exec).for_job(job.clone()))
            .unwrap();

        assert_eq!(registry.cancel(&exec), vec![token("T5_host")]);
        assert!(registry.cancel(&exec).is_empty());
        assert_eq!(registry.lookup_by_job(&job), None);
        assert_eq!(
            registry.resolve(&token("T5_host"), approve("T5_host")),
            Resolution::NotFound
        );
    }

    #[test]
    fn cancel_after_resolution_is_noop() {
        let registry = CorrelationRegistry::new();
        let exec = ExecutionId::new();
        registry
            .register(PendingWait::new(token("T1_host"), exec))
            .unwrap();
        registry.resolve(&token("T1_host"), approve("T1_host"));

        assert!(registry.cancel(&exec).is_empty());
        assert_eq!(
            registry.get(&token("T1_host")).unwrap().status(),
            WaitStatus::Resolved
        );
    }

    #[test]
    fn retracking_a_job_supersedes_the_pending_wait() {
        let registry = CorrelationRegistry::new();
        let job = JobId::new("J1");
        let first = ExecutionId::new();

        registry
            .register(PendingWait::new(token("old_tok"), first).for_job(job.clone()))
            .unwrap();
        let outcome = registry
            .register(PendingWait::new(token("new_tok"), ExecutionId::new()).for_job(job.clone()))
            .unwrap();

        assert_eq!(outcome.superseded, Some((token("old_tok"), first)));
        assert_eq!(registry.lookup_by_job(&job), Some(token("new_tok")));
        assert_eq!(registry.lookup_by_token(&token("old_tok")), None);
    }

    #[test]
    fn tombstone_can_be_reregistered() {
        let registry = CorrelationRegistry::new();
        registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()))
            .unwrap();
        registry.resolve(&token("T1_host"), approve("T1_host"));

        let exec = ExecutionId::new();
        registry
            .register(PendingWait::new(token("T1_host"), exec))
            .unwrap();
        assert_eq!(registry.lookup_by_token(&token("T1_host")), Some(exec));
        assert_eq!(
            registry.get(&token("T1_host")).unwrap().status(),
            WaitStatus::Pending
        );
    }

    #[test]
    fn decision_is_taken_once() {
        let registry = CorrelationRegistry::new();
        let job = JobId::new("J1");
        registry
            .register(PendingWait::new(token("T1_host"), ExecutionId::new()).for_job(job.clone()))
            .unwrap();
        registry.resolve(&token("T1_host"), approve("T1_host"));

        assert!(registry.pending_decision(&job).is_some());
        assert!(registry.take_decision(&token("T1_host")).is_some());
        assert!(registry.take_decision(&token("T1_host")).is_none());
        // Peeking still works after hand-over.
        assert!(registry.pending_decision(&job).is_some());
    }

    #[test]
    fn expired_tokens_and_tombstone_sweep() {
        let registry = CorrelationRegistry::new().with_tombstone_ttl(Duration::ZERO);
        registry
            .register(
                PendingWait::new(token("late"), ExecutionId::new()).with_timeout(Duration::ZERO),
            )
            .unwrap();
        registry
            .register(PendingWait::new(token("open"), ExecutionId::new()))
            .unwrap();

        let now = Utc::now();
        assert_eq!(registry.expired_tokens(now), vec![token("late")]);

        registry.expire(&token("late"));
        assert_eq!(registry.sweep_tombstones(Utc::now()), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&token("open")).is_some());
    }

    #[test]
    fn reopen_restores_pending_and_tombstones() {
        let store: Arc<dyn RegistryStore> = Arc::new(MemoryRegistryStore::new());
        let exec = ExecutionId::new();
        let job = JobId::new("J1");

        {
            let registry = CorrelationRegistry::open(Arc::clone(&store)).unwrap();
            registry
                .register(PendingWait::new(token("T1_host"), exec).for_job(job.clone()))
                .unwrap();
            registry
                .register(PendingWait::new(token("T2_host"), ExecutionId::new()))
                .unwrap();
            registry.resolve(&token("T2_host"), approve("T2_host"));
        }

        let registry = CorrelationRegistry::open(store).unwrap();
        assert_eq!(registry.lookup_by_token(&token("T1_host")), Some(exec));
        assert_eq!(registry.lookup_by_job(&job), Some(token("T1_host")));
        assert_eq!(
            registry.resolve(&token("T2_host"), approve("T2_host")),
            Resolution::AlreadyResolved {
                status: WaitStatus::Resolved
            }
        );
    }

    #[test]
    fn alias_reaches_the_registered_wait() {
        let registry = CorrelationRegistry::new();
        let exec = ExecutionId::new();
        registry
            .register(PendingWait::new(token("CHG0042"), exec).with_alias(token("T1_local")))
            .unwrap();

        assert_eq!(registry.canonical(&token("T1_local")), token("CHG0042"));
        assert_eq!(registry.canonical(&token("CHG0042")), token("CHG0042"));
        assert_eq!(registry.lookup_by_token(&token("T1_local")), Some(exec));

        assert!(matches!(
            registry.resolve(&token("T1_local"), approve("CHG0042")),
            Resolution::Resolved { .. }
        ));
        assert_eq!(
            registry.get(&token("CHG0042")).unwrap().status(),
            WaitStatus::Resolved
        );

        registry.remove(&token("CHG0042"));
        assert!(registry.get(&token("T1_local")).is_none());
        assert_eq!(registry.canonical(&token("T1_local")), token("T1_local"));
    }

    #[test]
    fn alias_survives_reopen_and_goes_with_cancel() {
        let store: Arc<dyn RegistryStore> = Arc::new(MemoryRegistryStore::new());
        let exec = ExecutionId::new();
        {
            let registry = CorrelationRegistry::open(Arc::clone(&store)).unwrap();
            registry
                .register(PendingWait::new(token("CHG7"), exec).with_alias(token("T1_adv")))
                .unwrap();
        }

        let registry = CorrelationRegistry::open(store).unwrap();
        assert_eq!(registry.lookup_by_token(&token("T1_adv")), Some(exec));

        assert_eq!(registry.cancel(&exec), vec![token("CHG7")]);
        assert!(registry.get(&token("T1_adv")).is_none());
    }
}
