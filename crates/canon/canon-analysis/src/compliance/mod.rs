//! Conflict detection: compliance checks, exceptions, severity and fixes.

pub mod detector;
pub mod exceptions;
pub mod fixes;
pub mod severity;
pub mod types;

pub use detector::ConflictDetector;
pub use exceptions::{ScopeCache, ScopeMatcher};
pub use severity::SeverityPolicy;
pub use types::{
    ComplianceOptions, ComplianceReport, FixStrategy, PatternException, Severity, SuggestedFix,
    Violation, ViolationRecord,
};
