//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```
//! use changegate_core::prelude::*;
//! ```

// Identifiers
pub use crate::types::{ExecutionId, JobId, Token};

// Errors
pub use crate::error::{GateError, Result};

// Decisions
pub use crate::decision::{CallbackDecision, DecisionResult};

// Registry
pub use crate::registry::{
    CorrelationRegistry, FileRegistryStore, MemoryRegistryStore, PendingWait, RegisterOutcome,
    RegistryStore, Resolution, WaitRecord, WaitStatus,
};

// Transport
pub use crate::transport::{
    ChangeTransport, Credentials, Endpoint, EndpointResolver, HttpMethod, TransportFuture,
    TransportResponse,
};
