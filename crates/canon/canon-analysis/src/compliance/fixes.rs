//! Advisory fixes for the categories with a mechanical rewrite.

use super::types::{FixStrategy, SuggestedFix};
use crate::extraction::naming;
use crate::extraction::Observation;
use crate::patterns::{PatternContent, StructuralRule};

/// Suggest a fix bringing `observation` in line with `expected`.
///
/// Only identifier and file renames are synthesized; every other category
/// yields `None`.
pub fn suggest(observation: &Observation, expected: &PatternContent) -> Option<SuggestedFix> {
    let subject = observation.subject.as_deref()?;
    match expected {
        PatternContent::Naming(rule) => {
            let renamed = naming::convert(subject, rule.style);
            if renamed == subject {
                return None;
            }
            Some(SuggestedFix {
                strategy: FixStrategy::Rename,
                description: format!("Rename '{subject}' to '{renamed}' ({})", rule.style),
                replacement: Some(renamed),
            })
        }
        PatternContent::Structural(StructuralRule::FileNaming { style }) => {
            let renamed_stem = naming::convert(subject, *style);
            if renamed_stem == subject {
                return None;
            }
            let file_name = observation.snippet.as_str();
            let renamed = match file_name.strip_prefix(subject) {
                Some(rest) => format!("{renamed_stem}{rest}"),
                None => renamed_stem,
            };
            Some(SuggestedFix {
                strategy: FixStrategy::RenameFile,
                description: format!("Rename file '{file_name}' to '{renamed}' ({style})"),
                replacement: Some(renamed),
            })
        }
        _ => None,
    }
}
