//! Structured span field definitions for Canon metrics.
//!
//! These constants define the standard field names used in tracing spans
//! across all Canon subsystems, so log queries can rely on them.

/// Learner: files extracted per batch.
pub const FILES_EXTRACTED: &str = "files_extracted";

/// Learner: extraction phase duration in milliseconds.
pub const EXTRACTION_DURATION: &str = "extraction_duration";

/// Learner: merge transaction duration in milliseconds.
pub const MERGE_DURATION: &str = "merge_duration";

/// Learner: files flagged degraded in a batch.
pub const DEGRADED_FILES: &str = "degraded_files";

/// Scheduler: changes superseded by coalescing before they started.
pub const CHANGES_SUPERSEDED: &str = "changes_superseded";

/// Detector: compliance check duration in milliseconds.
pub const COMPLIANCE_CHECK_TIME: &str = "compliance_check_time";

/// Detector: exception glob cache hits.
pub const GLOB_CACHE_HITS: &str = "glob_cache_hits";

/// Aggregator: sync duration in milliseconds.
pub const SYNC_DURATION: &str = "sync_duration";

/// Aggregator: compare-and-swap retries during a sync.
pub const CAS_RETRIES: &str = "cas_retries";

/// Storage: WAL checkpoint duration in milliseconds.
pub const CHECKPOINT_DURATION: &str = "checkpoint_duration";
