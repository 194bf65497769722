//! Typed concepts produced by a concept extractor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a declared concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptKind {
    Function,
    ArrowFunction,
    Method,
    Class,
    Interface,
    TypeAlias,
    Variable,
    Constant,
    Module,
    TestCase,
    Other,
}

impl ConceptKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::ArrowFunction => "arrow_function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::TypeAlias => "type_alias",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Module => "module",
            Self::TestCase => "test_case",
            Self::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "function" => Self::Function,
            "arrow_function" => Self::ArrowFunction,
            "method" => Self::Method,
            "class" => Self::Class,
            "interface" => Self::Interface,
            "type_alias" => Self::TypeAlias,
            "variable" => Self::Variable,
            "constant" => Self::Constant,
            "module" => Self::Module,
            "test_case" => Self::TestCase,
            _ => Self::Other,
        }
    }

    /// Kind under which naming conventions are tracked. Arrow functions share
    /// the function naming slot.
    pub fn naming_target(&self) -> Self {
        match self {
            Self::ArrowFunction => Self::Function,
            other => *other,
        }
    }
}

impl fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Line range of a concept, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line_start: u32,
    pub line_end: u32,
}

impl SourceLocation {
    pub fn line(line: u32) -> Self {
        Self {
            line_start: line,
            line_end: line,
        }
    }
}

/// One typed, confidence-scored concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub kind: ConceptKind,
    pub confidence: f64,
    pub location: SourceLocation,
}

/// Result of extracting one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub concepts: Vec<Concept>,
    /// Set when the extractor could not fully analyze the file
    /// (unsupported type, partial parse).
    pub degraded: bool,
}

impl Extraction {
    pub fn unsupported() -> Self {
        Self {
            concepts: Vec::new(),
            degraded: true,
        }
    }
}
