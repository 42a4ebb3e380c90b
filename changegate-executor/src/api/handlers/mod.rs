//! API request handlers.

pub mod callbacks;
pub mod executions;
pub mod health;
pub mod jobs;
pub mod waits;
