//! CLI command implementations.

pub mod serve;
pub mod validate;
pub mod version;
pub mod waits;
