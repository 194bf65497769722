//! Learned patterns: typed content, stable identity, confidence policy.

pub mod confidence;
pub mod content;
pub mod identity;
pub mod types;

pub use confidence::ConfidencePolicy;
pub use content::{
    CaseStyle, FunctionStyle, ImplementationRule, IndentStyle, NamingRule, PatternContent,
    QuoteStyle, StructuralRule, StyleRule, TestFileConvention, TestLocation, TestingRule,
};
pub use identity::pattern_id;
pub use types::{Pattern, PatternExample, PatternType};
