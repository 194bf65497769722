//! CanonEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for handling Canon events.
///
/// All methods have no-op default implementations, so handlers only need
/// to override the events they care about. The trait requires `Send + Sync`
/// because learner workers emit from their own threads.
pub trait CanonEventHandler: Send + Sync {
    // ---- Learning ----
    fn on_delta_applied(&self, _event: &DeltaAppliedEvent) {}
    fn on_delta_discarded(&self, _event: &DeltaDiscardedEvent) {}

    // ---- Pattern Lifecycle ----
    fn on_pattern_discovered(&self, _event: &PatternDiscoveredEvent) {}
    fn on_pattern_removed(&self, _event: &PatternRemovedEvent) {}

    // ---- Compliance ----
    fn on_violation_detected(&self, _event: &ViolationDetectedEvent) {}
    fn on_exception_added(&self, _event: &ExceptionAddedEvent) {}

    // ---- Registry & Aggregation ----
    fn on_project_linked(&self, _event: &ProjectLinkedEvent) {}
    fn on_project_unlinked(&self, _event: &ProjectUnlinkedEvent) {}
    fn on_sync_complete(&self, _event: &SyncCompleteEvent) {}

    // ---- Errors ----
    fn on_error(&self, _event: &ErrorEvent) {}
}
