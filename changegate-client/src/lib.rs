//! HTTP plumbing for changegate.
//!
//! Two halves:
//! - [`HttpTransport`], the reqwest-backed [`ChangeTransport`] the issuer uses
//!   to reach the change-control system, with basic or bearer auth.
//! - [`Client`], a typed client for a running changegate server: list
//!   waits, deliver callbacks, query job decisions, cancel executions.
//!
//! [`ChangeTransport`]: changegate_core::transport::ChangeTransport
//!
//! # Example
//!
//! ```no_run
//! use changegate_client::Client;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("http://localhost:8080")?;
//!
//! let report = client
//!     .deliver_callback("T1_abc_deploy", &json!({"result": "approved"}))
//!     .await?;
//! println!("delivery: {}", report.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All client operations return `Result<T, ClientError>`:
//!
//! ```no_run
//! # use changegate_client::{Client, ClientError};
//! # use changegate_core::types::ExecutionId;
//! # async fn example() -> Result<(), ClientError> {
//! # let client = Client::new("http://localhost:8080")?;
//! match client.cancel_execution(ExecutionId::new()).await {
//!     Ok(report) => println!("cancelled {}", report.cancelled_tokens.len()),
//!     Err(ClientError::Api { status: 404, .. }) => println!("unknown execution"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod transport;
mod types;
mod waits;

pub use client::Client;
pub use error::{ClientError, Result};
pub use transport::{DEFAULT_TIMEOUT, HttpTransport};
pub use types::{CancelReport, DeliveryReport, ExecutionInfo, HealthStatus, JobDecision};
