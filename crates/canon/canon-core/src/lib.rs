//! # canon-core
//!
//! Foundation crate for the Canon pattern engine.
//! Defines the collaborator traits, error enums, config structs, event
//! handlers, tracing setup, and shared types used by every other crate.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod traits;
pub mod tracing;
pub mod types;

pub use config::CanonConfig;
pub use errors::{CanonError, CanonErrorCode};
pub use events::{CanonEventHandler, EventDispatcher};
