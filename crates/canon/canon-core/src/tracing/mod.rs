//! Tracing and structured logging for Canon.

pub mod metrics;
pub mod setup;

pub use setup::init_tracing;
