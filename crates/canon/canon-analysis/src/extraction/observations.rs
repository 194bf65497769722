//! Observation pass: concepts and raw text to pattern evidence.
//!
//! Each observation names one concrete rule (`PatternContent`) the file
//! exhibits at a given line. The learner counts observations into pattern
//! frequencies; the conflict detector compares them against the dominant
//! rule of their slot.

use canon_core::types::{ConceptKind, Extraction};

use super::languages::Language;
use super::naming;
use crate::patterns::{
    FunctionStyle, ImplementationRule, IndentStyle, PatternContent, QuoteStyle, StructuralRule,
    StyleRule, TestFileConvention, TestLocation, TestingRule,
};

/// Longest snippet kept for an observation, in characters.
const MAX_SNIPPET_CHARS: usize = 160;

/// Directory names that mark a separate test tree.
const TEST_DIRECTORIES: &[&str] = &["tests", "test", "__tests__", "spec"];

/// One piece of evidence for a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub content: PatternContent,
    /// 1-based line the evidence was found on.
    pub line: u32,
    pub snippet: String,
    /// Identifier or file stem the observation is about, when there is one.
    pub subject: Option<String>,
}

/// Collect every observation for one file.
pub fn observe(path: &str, content: &str, extraction: &Extraction) -> Vec<Observation> {
    let lines: Vec<&str> = content.lines().collect();
    let language = Language::from_path(path);
    let mut observations = Vec::new();

    observe_naming(&lines, extraction, &mut observations);
    observe_file_naming(path, &mut observations);

    if let Some(language) = language {
        if language.is_js_like() {
            observe_function_style(&lines, extraction, &mut observations);
        }
        observe_indentation(&lines, &mut observations);
        if language.has_free_quote_choice() {
            observe_quotes(&lines, &mut observations);
        }
    }

    observe_testing(path, &mut observations);
    observations
}

fn observe_naming(lines: &[&str], extraction: &Extraction, out: &mut Vec<Observation>) {
    for concept in &extraction.concepts {
        let target = concept.kind.naming_target();
        if matches!(
            target,
            ConceptKind::Other | ConceptKind::Module | ConceptKind::TestCase
        ) {
            continue;
        }
        let Some(style) = naming::classify(&concept.name) else {
            continue;
        };
        let line = concept.location.line_start.max(1);
        out.push(Observation {
            content: PatternContent::naming(target, style),
            line,
            snippet: snippet_at(lines, line),
            subject: Some(concept.name.clone()),
        });
    }
}

fn observe_file_naming(path: &str, out: &mut Vec<Observation>) {
    let file_name = file_name(path);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    if let Some(style) = naming::classify(stem) {
        out.push(Observation {
            content: PatternContent::Structural(StructuralRule::FileNaming { style }),
            line: 1,
            snippet: file_name.to_string(),
            subject: Some(stem.to_string()),
        });
    }
}

fn observe_function_style(lines: &[&str], extraction: &Extraction, out: &mut Vec<Observation>) {
    for concept in &extraction.concepts {
        let style = match concept.kind {
            ConceptKind::Function => FunctionStyle::Declaration,
            ConceptKind::ArrowFunction => FunctionStyle::Arrow,
            _ => continue,
        };
        let line = concept.location.line_start.max(1);
        out.push(Observation {
            content: PatternContent::Implementation(ImplementationRule::FunctionStyle { style }),
            line,
            snippet: snippet_at(lines, line),
            subject: Some(concept.name.clone()),
        });
    }
}

fn observe_indentation(lines: &[&str], out: &mut Vec<Observation>) {
    let mut min_spaces: Option<(usize, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }
        if line.starts_with('\t') {
            if min_spaces.is_none() {
                out.push(indent_observation(lines, idx, IndentStyle::Tabs));
                return;
            }
            continue;
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if spaces == 0 {
            continue;
        }
        if min_spaces.map_or(true, |(min, _)| spaces < min) {
            min_spaces = Some((spaces, idx));
        }
    }

    let indent = match min_spaces {
        Some((2, idx)) => (IndentStyle::TwoSpaces, idx),
        Some((4, idx)) => (IndentStyle::FourSpaces, idx),
        _ => return,
    };
    out.push(indent_observation(lines, indent.1, indent.0));
}

fn indent_observation(lines: &[&str], idx: usize, indent: IndentStyle) -> Observation {
    let line = idx as u32 + 1;
    Observation {
        content: PatternContent::Style(StyleRule::Indentation { indent }),
        line,
        snippet: snippet_at(lines, line),
        subject: None,
    }
}

fn observe_quotes(lines: &[&str], out: &mut Vec<Observation>) {
    let mut single = 0usize;
    let mut double = 0usize;
    let mut first_single = None;
    let mut first_double = None;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*') {
            continue;
        }
        let s = trimmed.matches('\'').count();
        let d = trimmed.matches('"').count();
        if s > 0 && first_single.is_none() {
            first_single = Some(idx);
        }
        if d > 0 && first_double.is_none() {
            first_double = Some(idx);
        }
        single += s;
        double += d;
    }

    let (quote, idx) = match (single.cmp(&double), first_single, first_double) {
        (std::cmp::Ordering::Greater, Some(idx), _) => (QuoteStyle::Single, idx),
        (std::cmp::Ordering::Less, _, Some(idx)) => (QuoteStyle::Double, idx),
        _ => return,
    };
    let line = idx as u32 + 1;
    out.push(Observation {
        content: PatternContent::Style(StyleRule::Quotes { quote }),
        line,
        snippet: snippet_at(lines, line),
        subject: None,
    });
}

fn observe_testing(path: &str, out: &mut Vec<Observation>) {
    let file_name = file_name(path);
    let convention = test_file_convention(file_name);
    let test_dir = path
        .split('/')
        .rev()
        .skip(1)
        .find(|segment| TEST_DIRECTORIES.contains(segment));

    if convention.is_none() && test_dir.is_none() {
        return;
    }

    if let Some(convention) = convention {
        out.push(Observation {
            content: PatternContent::Testing(TestingRule::FileNaming { convention }),
            line: 1,
            snippet: file_name.to_string(),
            subject: Some(file_name.to_string()),
        });
    }

    let location = match test_dir {
        Some(directory) => TestLocation::Separate {
            directory: directory.to_string(),
        },
        None => TestLocation::Colocated,
    };
    out.push(Observation {
        content: PatternContent::Testing(TestingRule::Location { location }),
        line: 1,
        snippet: path.to_string(),
        subject: Some(file_name.to_string()),
    });
}

/// Test naming convention a file name follows, if any.
pub fn test_file_convention(file_name: &str) -> Option<TestFileConvention> {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    if file_name.contains(".test.") {
        Some(TestFileConvention::DotTest)
    } else if file_name.contains(".spec.") {
        Some(TestFileConvention::DotSpec)
    } else if stem.starts_with("test_") {
        Some(TestFileConvention::TestPrefix)
    } else if stem.ends_with("_test") {
        Some(TestFileConvention::TestSuffix)
    } else {
        None
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn snippet_at(lines: &[&str], line: u32) -> String {
    let text = lines
        .get((line as usize).saturating_sub(1))
        .map(|l| l.trim())
        .unwrap_or_default();
    text.chars().take(MAX_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::LexicalExtractor;
    use crate::patterns::CaseStyle;
    use canon_core::traits::ConceptExtractor;

    fn observe_file(path: &str, src: &str) -> Vec<Observation> {
        let extraction = LexicalExtractor::new().extract(path, src).unwrap();
        observe(path, src, &extraction)
    }

    fn contents(observations: &[Observation]) -> Vec<PatternContent> {
        observations.iter().map(|o| o.content.clone()).collect()
    }

    #[test]
    fn snake_case_variable_is_observed_at_its_line() {
        let obs = observe_file("src/a.ts", "const user_id = 1;\n");
        let naming: Vec<_> = obs
            .iter()
            .filter(|o| matches!(o.content, PatternContent::Naming(_)))
            .collect();
        assert_eq!(naming.len(), 1);
        assert_eq!(
            naming[0].content,
            PatternContent::naming(ConceptKind::Variable, CaseStyle::Snake)
        );
        assert_eq!(naming[0].line, 1);
        assert_eq!(naming[0].snippet, "const user_id = 1;");
        assert_eq!(naming[0].subject.as_deref(), Some("user_id"));
    }

    #[test]
    fn ambiguous_file_stem_is_not_observed() {
        let obs = observe_file("src/a.ts", "const x = 1;\n");
        assert!(!contents(&obs)
            .iter()
            .any(|c| matches!(c, PatternContent::Structural(_))));
    }

    #[test]
    fn file_naming_uses_stem_before_first_dot() {
        let obs = observe_file("src/user-profile.test.ts", "");
        let all = contents(&obs);
        assert!(all.contains(&PatternContent::Structural(StructuralRule::FileNaming {
            style: CaseStyle::Kebab
        })));
        assert!(all.contains(&PatternContent::Testing(TestingRule::FileNaming {
            convention: TestFileConvention::DotTest
        })));
        assert!(all.contains(&PatternContent::Testing(TestingRule::Location {
            location: TestLocation::Colocated
        })));
    }

    #[test]
    fn separate_test_directory_is_detected() {
        let obs = observe_file("tests/test_users.py", "def test_create():\n    pass\n");
        assert!(contents(&obs).contains(&PatternContent::Testing(TestingRule::Location {
            location: TestLocation::Separate {
                directory: "tests".to_string()
            }
        })));
    }

    #[test]
    fn function_style_only_for_js_like_languages() {
        let ts = observe_file("src/api.ts", "function loadUser() {}\nconst save = () => {};\n");
        let styles: Vec<_> = contents(&ts)
            .into_iter()
            .filter(|c| matches!(c, PatternContent::Implementation(_)))
            .collect();
        assert_eq!(styles.len(), 2);

        let py = observe_file("src/api.py", "def load_user():\n    pass\n");
        assert!(!contents(&py)
            .iter()
            .any(|c| matches!(c, PatternContent::Implementation(_))));
    }

    #[test]
    fn indentation_and_quotes() {
        let src = "function run() {\n  const a = 'x';\n    const b = 'y';\n}\n";
        let all = contents(&observe_file("src/run.js", src));
        assert!(all.contains(&PatternContent::Style(StyleRule::Indentation {
            indent: IndentStyle::TwoSpaces
        })));
        assert!(all.contains(&PatternContent::Style(StyleRule::Quotes {
            quote: QuoteStyle::Single
        })));

        let tabs = contents(&observe_file("main.go", "func main() {\n\tx := 1\n}\n"));
        assert!(tabs.contains(&PatternContent::Style(StyleRule::Indentation {
            indent: IndentStyle::Tabs
        })));
    }

    #[test]
    fn unknown_language_has_no_style_observations() {
        let obs = observe("legacy/old.x", "  let a = 'x';\n", &Extraction::default());
        assert!(obs.is_empty());
    }
}
