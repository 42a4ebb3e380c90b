//! HTTP API for callback delivery and wait inspection.
//!
//! Endpoints, all under `/api/v1`:
//! - `POST /callbacks/{token}`: deliver a decision
//! - `GET /callbacks/{token}`: inspect a wait
//! - `GET /waits`: list pending waits
//! - `GET /jobs/{job}/decision`: decision recorded for a job
//! - `GET /executions/{id}` and `DELETE /executions/{id}`: inspect or cancel
//! - `GET /health` and `GET /status`
//!
//! The server uses hyper 1.x directly; each connection runs in its own task.
//!
//! # Example
//!
//! ```no_run
//! use changegate_executor::api::{ApiServer, AppState, ServerConfig};
//! use changegate_executor::orchestrator::Orchestrator;
//! use changegate_executor::tracking::JobTracker;
//! use changegate_core::registry::CorrelationRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> changegate_core::Result<()> {
//! let registry = Arc::new(CorrelationRegistry::new());
//! let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&registry)));
//! let tracker = JobTracker::new(registry, "jenkins");
//! let state = Arc::new(AppState::new(orchestrator, tracker));
//!
//! let mut server = ApiServer::new(ServerConfig::new("0.0.0.0", 8080), state);
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod handlers;
mod request;
mod response;
mod router;
mod server;
mod state;

pub use error::ApiError;
pub use router::route;
pub use server::{ApiServer, ServerConfig};
pub use state::AppState;
