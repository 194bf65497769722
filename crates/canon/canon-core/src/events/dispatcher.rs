//! EventDispatcher — synchronous event dispatch with zero overhead when empty.

use std::sync::Arc;

use super::handler::CanonEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// When no handlers are registered, `emit` iterates over an empty Vec.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn CanonEventHandler>>,
}

impl EventDispatcher {
    /// Create a new empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register an event handler.
    pub fn register(&mut self, handler: Arc<dyn CanonEventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Emit an event to all registered handlers.
    /// Handlers that panic are caught and do not prevent subsequent handlers
    /// from receiving the event.
    fn emit<F: Fn(&dyn CanonEventHandler)>(&self, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::warn!("event handler panicked, continuing with remaining handlers");
            }
        }
    }

    // ---- Learning ----
    pub fn emit_delta_applied(&self, event: &DeltaAppliedEvent) {
        self.emit(|h| h.on_delta_applied(event));
    }

    pub fn emit_delta_discarded(&self, event: &DeltaDiscardedEvent) {
        self.emit(|h| h.on_delta_discarded(event));
    }

    // ---- Pattern Lifecycle ----
    pub fn emit_pattern_discovered(&self, event: &PatternDiscoveredEvent) {
        self.emit(|h| h.on_pattern_discovered(event));
    }

    pub fn emit_pattern_removed(&self, event: &PatternRemovedEvent) {
        self.emit(|h| h.on_pattern_removed(event));
    }

    // ---- Compliance ----
    pub fn emit_violation_detected(&self, event: &ViolationDetectedEvent) {
        self.emit(|h| h.on_violation_detected(event));
    }

    pub fn emit_exception_added(&self, event: &ExceptionAddedEvent) {
        self.emit(|h| h.on_exception_added(event));
    }

    // ---- Registry & Aggregation ----
    pub fn emit_project_linked(&self, event: &ProjectLinkedEvent) {
        self.emit(|h| h.on_project_linked(event));
    }

    pub fn emit_project_unlinked(&self, event: &ProjectUnlinkedEvent) {
        self.emit(|h| h.on_project_unlinked(event));
    }

    pub fn emit_sync_complete(&self, event: &SyncCompleteEvent) {
        self.emit(|h| h.on_sync_complete(event));
    }

    // ---- Errors ----
    pub fn emit_error(&self, event: &ErrorEvent) {
        self.emit(|h| h.on_error(event));
    }
}
