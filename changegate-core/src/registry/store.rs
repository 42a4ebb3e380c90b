//! Persistence seam for the correlation registry.

use super::record::WaitRecord;
use crate::error::Result;
use crate::types::Token;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Durable backing for registry records.
///
/// The registry keeps the authoritative in-process view and writes through to
/// the store on every transition, so a restarted process can reload pending
/// waits and their tombstones with [`load`](RegistryStore::load).
pub trait RegistryStore: Send + Sync {
    /// Load every persisted record.
    fn load(&self) -> Result<Vec<WaitRecord>>;

    /// Insert or replace the record for its token.
    fn put(&self, record: &WaitRecord) -> Result<()>;

    /// Delete the record for a token. Deleting a missing token is not an error.
    fn delete(&self, token: &Token) -> Result<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// In-memory store; records survive only as long as the store value.
///
/// Sharing one instance between two registries is how tests simulate a
/// process restart.
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    records: RwLock<HashMap<Token, WaitRecord>>,
}

impl MemoryRegistryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Fetch a stored record.
    pub fn get(&self, token: &Token) -> Option<WaitRecord> {
        self.records.read().get(token).cloned()
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn load(&self) -> Result<Vec<WaitRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn put(&self, record: &WaitRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.wait.token.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, token: &Token) -> Result<()> {
        self.records.write().remove(token);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
