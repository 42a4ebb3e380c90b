//! Logging setup.
//!
//! Format is controlled by `CHANGEGATE_LOG_FORMAT`:
//! - `json` - structured JSON, one event per line
//! - `pretty` - multi-line human-readable output
//! - `compact` - single-line output
//!
//! The filter comes from `CHANGEGATE_LOG_LEVEL`, falling back to `RUST_LOG`.
//!
//! # Example
//!
//! ```no_run
//! use changegate_executor::observability::{LogFormat, TracingConfig, init_tracing};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = TracingConfig::builder()
//!     .log_format(LogFormat::Json)
//!     .log_filter("info,changegate_executor=debug")
//!     .build();
//! let _guard = init_tracing(config)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};

/// Span covering one gated execution.
#[macro_export]
macro_rules! instrument_wait {
    ($execution_id:expr, $token:expr) => {
        tracing::info_span!(
            "gate_wait",
            execution_id = %$execution_id,
            token = %$token
        )
    };
}
