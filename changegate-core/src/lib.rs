//! ChangeGate core library.
//!
//! Shared types for gating pipeline executions on an external change-approval
//! decision: identifiers, callback decisions, the error taxonomy, and the
//! correlation registry that maps callback tokens to suspended executions.
//!
//! # Key Components
//!
//! - **Types**: callback tokens, execution and job identifiers
//! - **Decision**: normalized approval results carried by callbacks
//! - **Registry**: token -> pending wait mapping with at-most-once resolution
//! - **Transport**: seams for the outbound HTTP client and endpoint lookup
//!
//! # Example
//!
//! ```
//! use changegate_core::prelude::*;
//!
//! let registry = CorrelationRegistry::new();
//! let token = Token::parse("gate_abc123").unwrap();
//! let execution = ExecutionId::new();
//!
//! registry.register(PendingWait::new(token.clone(), execution)).unwrap();
//! let decision = CallbackDecision::new(token.clone(), DecisionResult::Approved);
//!
//! assert!(matches!(
//!     registry.resolve(&token, decision),
//!     Resolution::Resolved { .. }
//! ));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decision;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod transport;
pub mod types;

pub use decision::{CallbackDecision, DecisionResult};
pub use error::{GateError, Result};
pub use registry::{CorrelationRegistry, PendingWait, Resolution, WaitStatus};
pub use transport::{ChangeTransport, Endpoint, EndpointResolver, HttpMethod};
pub use types::{ExecutionId, JobId, Token};
