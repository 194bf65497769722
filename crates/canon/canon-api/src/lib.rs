//! # canon-api
//!
//! The operation boundary for Canon: one call = one operation, structured
//! arguments in, a structured result or an [`ApiError`] out.
//!
//! Architecture:
//! - `runtime` — `CanonRuntime`, an explicit handle owning the global store,
//!   the registry, the aggregator and lazily opened per-project stores
//! - `error` — every subsystem error converted to `ApiError{code, message, retryable}`
//! - `bindings` — the exposed operations (direct and queued learning, compliance,
//!   aggregation, registry) plus a JSON dispatcher

pub mod bindings;
pub mod error;
pub mod runtime;

pub use error::ApiError;
pub use runtime::{CanonRuntime, ProjectHandle, RuntimeOptions};
