//! Cross-project pattern signatures.
//!
//! A signature names a rule independently of the project it was learned in:
//! `naming:variable:camelCase`, `style:quotes:single`,
//! `testing:location:separate`. Directory names stay out of signatures.

use crate::patterns::{
    ImplementationRule, PatternContent, StructuralRule, StyleRule, TestLocation, TestingRule,
};

pub fn signature(content: &PatternContent) -> String {
    format!("{}:{}", content.slot(), rule_value(content))
}

fn rule_value(content: &PatternContent) -> String {
    match content {
        PatternContent::Naming(rule) => rule.style.name().to_string(),
        PatternContent::Structural(StructuralRule::FileNaming { style }) => style.name().to_string(),
        PatternContent::Implementation(ImplementationRule::FunctionStyle { style }) => {
            style.name().to_string()
        }
        PatternContent::Style(StyleRule::Indentation { indent }) => indent.name().to_string(),
        PatternContent::Style(StyleRule::Quotes { quote }) => quote.name().to_string(),
        PatternContent::Testing(TestingRule::FileNaming { convention }) => {
            convention.name().to_string()
        }
        PatternContent::Testing(TestingRule::Location { location }) => match location {
            TestLocation::Colocated => "colocated".to_string(),
            TestLocation::Separate { .. } => "separate".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{CaseStyle, QuoteStyle};
    use canon_core::types::ConceptKind;

    #[test]
    fn signatures_are_readable_and_distinct() {
        let camel = PatternContent::naming(ConceptKind::Variable, CaseStyle::Camel);
        let snake = PatternContent::naming(ConceptKind::Variable, CaseStyle::Snake);
        assert_eq!(signature(&camel), "naming:variable:camelCase");
        assert_ne!(signature(&camel), signature(&snake));

        let quotes = PatternContent::Style(StyleRule::Quotes {
            quote: QuoteStyle::Single,
        });
        assert_eq!(signature(&quotes), "style:quotes:single");
    }

    #[test]
    fn test_location_ignores_directory_name() {
        let separate = |directory: &str| {
            PatternContent::Testing(TestingRule::Location {
                location: TestLocation::Separate {
                    directory: directory.into(),
                },
            })
        };
        assert_eq!(signature(&separate("tests")), "testing:location:separate");
        assert_eq!(signature(&separate("tests")), signature(&separate("__tests__")));
    }
}
