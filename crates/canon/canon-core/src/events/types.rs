//! Event payload types for all Canon events.

/// Payload for `on_delta_applied`.
#[derive(Debug, Clone)]
pub struct DeltaAppliedEvent {
    pub project_id: String,
    pub delta_id: String,
    pub trigger: String,
    pub preceding_version: u64,
    pub resulting_version: u64,
    pub patterns_added: u32,
    pub patterns_modified: u32,
    pub patterns_removed: u32,
    pub partial_degradation: bool,
    pub duration_ms: u64,
}

/// Payload for `on_delta_discarded`.
#[derive(Debug, Clone)]
pub struct DeltaDiscardedEvent {
    pub project_id: String,
    pub preceding_version: u64,
    pub error_code: String,
    pub message: String,
}

/// Payload for `on_pattern_discovered`.
#[derive(Debug, Clone)]
pub struct PatternDiscoveredEvent {
    pub project_id: String,
    pub pattern_id: String,
    pub pattern_type: String,
    pub confidence: f64,
}

/// Payload for `on_pattern_removed`.
#[derive(Debug, Clone)]
pub struct PatternRemovedEvent {
    pub project_id: String,
    pub pattern_id: String,
    pub version: u64,
}

/// Payload for `on_violation_detected`.
#[derive(Debug, Clone)]
pub struct ViolationDetectedEvent {
    pub pattern_id: String,
    pub file_path: String,
    pub line: u32,
    pub severity: String,
}

/// Payload for `on_exception_added`.
#[derive(Debug, Clone)]
pub struct ExceptionAddedEvent {
    pub project_id: String,
    pub pattern_id: String,
    pub scope_glob: String,
}

/// Payload for `on_project_linked`.
#[derive(Debug, Clone)]
pub struct ProjectLinkedEvent {
    pub project_id: String,
    pub path: String,
    pub relinked: bool,
}

/// Payload for `on_project_unlinked`.
#[derive(Debug, Clone)]
pub struct ProjectUnlinkedEvent {
    pub project_id: String,
}

/// Payload for `on_sync_complete`.
#[derive(Debug, Clone)]
pub struct SyncCompleteEvent {
    pub project_id: String,
    pub patterns_added: u32,
    pub patterns_updated: u32,
    pub patterns_removed: u32,
    pub checkpoint: u64,
    pub duration_ms: u64,
}

/// Payload for `on_error`.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub message: String,
    pub error_code: String,
}
