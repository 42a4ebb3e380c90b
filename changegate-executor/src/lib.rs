//! changegate executor - approval gates for pipeline executions.
//!
//! This crate turns the core registry into a running service:
//! - Issuer that submits change requests and registers the resulting waits
//! - Orchestrator that suspends executions until a decision, a timeout or a
//!   cancellation
//! - Callback receiver and HTTP API for inbound decisions
//! - Timeout processor that expires orphaned waits and sweeps tombstones
//! - YAML configuration and logging setup
//!
//! # Example
//!
//! ```no_run
//! use changegate_executor::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(issuer: Arc<Issuer>) -> changegate_core::Result<()> {
//! let registry = Arc::clone(issuer.tracker().registry());
//! let orchestrator = Arc::new(Orchestrator::new(registry).with_issuer(issuer));
//!
//! let request = ChangeRequest::new("deploy-prod", "42", "Deploy build 42");
//! let handle = orchestrator.run(ExecutionId::new(), &request).await?;
//! match handle.wait().await? {
//!     WaitOutcome::Approved { .. } => println!("go"),
//!     other => println!("stopped: {}", other.state()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod issuer;
pub mod observability;
pub mod orchestrator;
pub mod receiver;
pub mod timeout;
pub mod tracking;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::api::{ApiError, ApiServer, AppState, ServerConfig};
    pub use crate::config::{ConfiguredEndpoints, GateConfig, StoreKind};
    pub use crate::issuer::{ChangeRequest, Issuer, Submission};
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::orchestrator::{
        ExecutionRecord, Orchestrator, WaitHandle, WaitOutcome, WaitState,
    };
    pub use crate::receiver::{CallbackReceiver, ReceiveStatus};
    pub use crate::timeout::{SweepReport, TimeoutProcessor};
    pub use crate::tracking::JobTracker;
    pub use changegate_core::prelude::*;
}
