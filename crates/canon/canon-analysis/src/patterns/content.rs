//! Tagged pattern content, one variant per pattern type.
//!
//! Each rule lives in a *slot*: rules in the same slot are mutually
//! exclusive alternatives (camelCase vs snake_case variables), and the
//! conflict detector compares an observation against the dominant rule of
//! its slot.

use std::fmt;

use canon_core::types::ConceptKind;
use serde::{Deserialize, Serialize};

use super::types::PatternType;

/// Identifier case convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseStyle {
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "PascalCase")]
    Pascal,
    #[serde(rename = "snake_case")]
    Snake,
    #[serde(rename = "SCREAMING_SNAKE_CASE")]
    ScreamingSnake,
    #[serde(rename = "kebab-case")]
    Kebab,
}

impl CaseStyle {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Snake => "snake_case",
            Self::ScreamingSnake => "SCREAMING_SNAKE_CASE",
            Self::Kebab => "kebab-case",
        }
    }
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionStyle {
    Declaration,
    Arrow,
}

impl FunctionStyle {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Declaration => "declaration",
            Self::Arrow => "arrow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentStyle {
    Tabs,
    TwoSpaces,
    FourSpaces,
}

impl IndentStyle {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tabs => "tabs",
            Self::TwoSpaces => "two_spaces",
            Self::FourSpaces => "four_spaces",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    Single,
    Double,
}

impl QuoteStyle {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }
}

/// How test files are told apart from source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestFileConvention {
    /// `user.test.ts`
    DotTest,
    /// `user.spec.ts`
    DotSpec,
    /// `test_user.py`
    TestPrefix,
    /// `user_test.go`
    TestSuffix,
}

impl TestFileConvention {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DotTest => "dot_test",
            Self::DotSpec => "dot_spec",
            Self::TestPrefix => "test_prefix",
            Self::TestSuffix => "test_suffix",
        }
    }
}

/// Where test files live relative to the code they cover.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestLocation {
    /// Next to the source file.
    Colocated,
    /// Under a dedicated directory such as `tests/` or `__tests__/`.
    Separate { directory: String },
}

impl TestLocation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Colocated => "colocated",
            Self::Separate { .. } => "separate",
        }
    }
}

/// Identifier naming for one kind of declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamingRule {
    pub target: ConceptKind,
    pub style: CaseStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StructuralRule {
    FileNaming { style: CaseStyle },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ImplementationRule {
    FunctionStyle { style: FunctionStyle },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StyleRule {
    Indentation { indent: IndentStyle },
    Quotes { quote: QuoteStyle },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TestingRule {
    FileNaming { convention: TestFileConvention },
    Location { location: TestLocation },
}

/// Pattern content, tagged by pattern type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternContent {
    Naming(NamingRule),
    Structural(StructuralRule),
    Implementation(ImplementationRule),
    Style(StyleRule),
    Testing(TestingRule),
}

impl PatternContent {
    pub fn naming(target: ConceptKind, style: CaseStyle) -> Self {
        Self::Naming(NamingRule { target, style })
    }

    pub fn pattern_type(&self) -> PatternType {
        match self {
            Self::Naming(_) => PatternType::Naming,
            Self::Structural(_) => PatternType::Structural,
            Self::Implementation(_) => PatternType::Implementation,
            Self::Style(_) => PatternType::Style,
            Self::Testing(_) => PatternType::Testing,
        }
    }

    /// The slot this rule competes in. Rules sharing a slot are alternatives.
    pub fn slot(&self) -> String {
        match self {
            Self::Naming(rule) => format!("naming:{}", rule.target.name()),
            Self::Structural(StructuralRule::FileNaming { .. }) => "structural:file_naming".to_string(),
            Self::Implementation(ImplementationRule::FunctionStyle { .. }) => {
                "implementation:function_style".to_string()
            }
            Self::Style(StyleRule::Indentation { .. }) => "style:indentation".to_string(),
            Self::Style(StyleRule::Quotes { .. }) => "style:quotes".to_string(),
            Self::Testing(TestingRule::FileNaming { .. }) => "testing:file_naming".to_string(),
            Self::Testing(TestingRule::Location { .. }) => "testing:location".to_string(),
        }
    }

    /// Human-readable statement of the rule.
    pub fn describe(&self) -> String {
        match self {
            Self::Naming(rule) => format!("{} names use {}", rule.target.name(), rule.style),
            Self::Structural(StructuralRule::FileNaming { style }) => {
                format!("file names use {style}")
            }
            Self::Implementation(ImplementationRule::FunctionStyle { style }) => match style {
                FunctionStyle::Declaration => "functions are declared with the function keyword".to_string(),
                FunctionStyle::Arrow => "functions are declared as arrow functions".to_string(),
            },
            Self::Style(StyleRule::Indentation { indent }) => match indent {
                IndentStyle::Tabs => "indentation uses tabs".to_string(),
                IndentStyle::TwoSpaces => "indentation uses two spaces".to_string(),
                IndentStyle::FourSpaces => "indentation uses four spaces".to_string(),
            },
            Self::Style(StyleRule::Quotes { quote }) => {
                format!("string literals use {} quotes", quote.name())
            }
            Self::Testing(TestingRule::FileNaming { convention }) => match convention {
                TestFileConvention::DotTest => "test files are named *.test.*".to_string(),
                TestFileConvention::DotSpec => "test files are named *.spec.*".to_string(),
                TestFileConvention::TestPrefix => "test files are named test_*".to_string(),
                TestFileConvention::TestSuffix => "test files are named *_test".to_string(),
            },
            Self::Testing(TestingRule::Location { location }) => match location {
                TestLocation::Colocated => "tests live next to the code they cover".to_string(),
                TestLocation::Separate { directory } => format!("tests live under {directory}/"),
            },
        }
    }

    /// Canonical JSON: object keys sorted, no whitespace.
    pub fn canonical_json(&self) -> String {
        // `serde_json::Value` maps are ordered by key.
        serde_json::to_value(self)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }
}
