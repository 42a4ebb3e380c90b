//! Token correlation registry and its persistence backends.

mod correlation;
mod file;
mod record;
mod store;

pub use correlation::{
    CorrelationRegistry, DEFAULT_TOMBSTONE_TTL, RegisterOutcome, Resolution, WaitSnapshot,
};
pub use file::FileRegistryStore;
pub use record::{PendingWait, WaitRecord, WaitStatus};
pub use store::{MemoryRegistryStore, RegistryStore};
