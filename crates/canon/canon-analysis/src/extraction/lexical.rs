//! Regex-based concept extractor used when no parser collaborator is wired in.
//!
//! Line-oriented: each source line is matched against an ordered rule table
//! for its language and the first matching rule wins. Good enough for
//! declaration names and kinds, which is all the observation pass needs.

use std::sync::LazyLock;

use canon_core::errors::ExtractionError;
use canon_core::traits::ConceptExtractor;
use canon_core::types::{Concept, ConceptKind, Extraction, SourceLocation};
use regex::Regex;

use super::languages::Language;
use super::naming;
use crate::patterns::CaseStyle;

/// Confidence assigned to every lexically extracted concept.
const LEXICAL_CONFIDENCE: f64 = 0.7;

macro_rules! decl_regex {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── JavaScript / TypeScript ────────────────────────────────────────────────
decl_regex!(
    JS_FUNCTION,
    r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)"
);
decl_regex!(
    JS_ARROW,
    r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>"
);
decl_regex!(
    JS_CLASS,
    r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)"
);
decl_regex!(JS_INTERFACE, r"^\s*(?:export\s+)?interface\s+([A-Za-z_$][\w$]*)");
decl_regex!(
    JS_TYPE_ALIAS,
    r"^\s*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*="
);
decl_regex!(
    JS_VARIABLE,
    r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)"
);
decl_regex!(
    JS_METHOD,
    r"^\s+(?:(?:public|private|protected|static|async|readonly|override)\s+)*([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::\s*[^{]+)?\{"
);

// ── Python ─────────────────────────────────────────────────────────────────
decl_regex!(PY_METHOD, r"^\s+(?:async\s+)?def\s+([A-Za-z_]\w*)");
decl_regex!(PY_FUNCTION, r"^(?:async\s+)?def\s+([A-Za-z_]\w*)");
decl_regex!(PY_CLASS, r"^\s*class\s+([A-Za-z_]\w*)");
decl_regex!(PY_ASSIGN, r"^([A-Za-z_]\w*)\s*(?::[^=]+)?=[^=]");

// ── Rust ───────────────────────────────────────────────────────────────────
decl_regex!(
    RS_METHOD,
    r"^\s+(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+([A-Za-z_]\w*)"
);
decl_regex!(
    RS_FUNCTION,
    r"^(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+([A-Za-z_]\w*)"
);
decl_regex!(RS_TRAIT, r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+([A-Za-z_]\w*)");
decl_regex!(
    RS_TYPE_DEF,
    r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|union)\s+([A-Za-z_]\w*)"
);
decl_regex!(RS_TYPE_ALIAS, r"^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+([A-Za-z_]\w*)");
decl_regex!(
    RS_CONST,
    r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?:mut\s+)?([A-Za-z_]\w*)\s*:"
);
decl_regex!(RS_LET, r"^\s*let\s+(?:mut\s+)?([A-Za-z_]\w*)");
decl_regex!(RS_MODULE, r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_]\w*)");

// ── Go ─────────────────────────────────────────────────────────────────────
decl_regex!(GO_METHOD, r"^func\s+\([^)]*\)\s*([A-Za-z_]\w*)");
decl_regex!(GO_FUNCTION, r"^func\s+([A-Za-z_]\w*)");
decl_regex!(GO_INTERFACE, r"^type\s+([A-Za-z_]\w*)\s+interface\b");
decl_regex!(GO_TYPE, r"^type\s+([A-Za-z_]\w*)\s+");
decl_regex!(GO_CONST, r"^\s*const\s+([A-Za-z_]\w*)");
decl_regex!(GO_VAR, r"^\s*var\s+([A-Za-z_]\w*)");
decl_regex!(GO_SHORT_VAR, r"^\s*([A-Za-z_]\w*)\s*:=");

// ── Java ───────────────────────────────────────────────────────────────────
decl_regex!(
    JAVA_INTERFACE,
    r"^\s*(?:(?:public|private|protected|abstract|static|sealed)\s+)*interface\s+([A-Za-z_]\w*)"
);
decl_regex!(
    JAVA_CLASS,
    r"^\s*(?:(?:public|private|protected|abstract|final|static|sealed)\s+)*(?:class|enum|record)\s+([A-Za-z_]\w*)"
);
decl_regex!(
    JAVA_CONSTANT,
    r"^\s*(?:(?:public|private|protected)\s+)?static\s+final\s+[\w<>\[\], ?]+\s+([A-Za-z_]\w*)\s*="
);
decl_regex!(
    JAVA_METHOD,
    r"^\s+(?:(?:public|private|protected|static|final|abstract|synchronized)\s+)+[\w<>\[\], ?]+\s+([A-Za-z_]\w*)\s*\("
);

/// Control-flow keywords that look like method headers to the JS method rule.
const JS_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "do", "else", "with",
];

#[derive(Clone, Copy)]
struct Rule {
    regex: &'static LazyLock<Option<Regex>>,
    kind: ConceptKind,
    /// Variables named in SCREAMING_SNAKE_CASE are reported as constants.
    promote_screaming: bool,
}

const fn rule(regex: &'static LazyLock<Option<Regex>>, kind: ConceptKind) -> Rule {
    Rule {
        regex,
        kind,
        promote_screaming: false,
    }
}

const fn promoting(regex: &'static LazyLock<Option<Regex>>, kind: ConceptKind) -> Rule {
    Rule {
        regex,
        kind,
        promote_screaming: true,
    }
}

static JS_RULES: [Rule; 7] = [
    rule(&JS_FUNCTION, ConceptKind::Function),
    rule(&JS_ARROW, ConceptKind::ArrowFunction),
    rule(&JS_CLASS, ConceptKind::Class),
    rule(&JS_INTERFACE, ConceptKind::Interface),
    rule(&JS_TYPE_ALIAS, ConceptKind::TypeAlias),
    promoting(&JS_VARIABLE, ConceptKind::Variable),
    rule(&JS_METHOD, ConceptKind::Method),
];

static PY_RULES: [Rule; 4] = [
    rule(&PY_METHOD, ConceptKind::Method),
    rule(&PY_FUNCTION, ConceptKind::Function),
    rule(&PY_CLASS, ConceptKind::Class),
    promoting(&PY_ASSIGN, ConceptKind::Variable),
];

static RS_RULES: [Rule; 8] = [
    rule(&RS_METHOD, ConceptKind::Method),
    rule(&RS_FUNCTION, ConceptKind::Function),
    rule(&RS_TRAIT, ConceptKind::Interface),
    rule(&RS_TYPE_DEF, ConceptKind::Class),
    rule(&RS_TYPE_ALIAS, ConceptKind::TypeAlias),
    rule(&RS_CONST, ConceptKind::Constant),
    rule(&RS_LET, ConceptKind::Variable),
    rule(&RS_MODULE, ConceptKind::Module),
];

static GO_RULES: [Rule; 7] = [
    rule(&GO_METHOD, ConceptKind::Method),
    rule(&GO_FUNCTION, ConceptKind::Function),
    rule(&GO_INTERFACE, ConceptKind::Interface),
    rule(&GO_TYPE, ConceptKind::Class),
    rule(&GO_CONST, ConceptKind::Constant),
    promoting(&GO_VAR, ConceptKind::Variable),
    rule(&GO_SHORT_VAR, ConceptKind::Variable),
];

static JAVA_RULES: [Rule; 4] = [
    rule(&JAVA_INTERFACE, ConceptKind::Interface),
    rule(&JAVA_CLASS, ConceptKind::Class),
    rule(&JAVA_CONSTANT, ConceptKind::Constant),
    rule(&JAVA_METHOD, ConceptKind::Method),
];

fn rules_for(language: Language) -> &'static [Rule] {
    match language {
        Language::TypeScript | Language::JavaScript => &JS_RULES,
        Language::Python => &PY_RULES,
        Language::Rust => &RS_RULES,
        Language::Go => &GO_RULES,
        Language::Java => &JAVA_RULES,
    }
}

/// Built-in line-oriented extractor.
#[derive(Debug, Clone, Default)]
pub struct LexicalExtractor;

impl LexicalExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_language(&self, language: Language, content: &str) -> Vec<Concept> {
        let rules = rules_for(language);
        let mut concepts = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            if is_comment(line) {
                continue;
            }
            let Some((rule, name)) = first_match(rules, line) else {
                continue;
            };
            if language.is_js_like()
                && rule.kind == ConceptKind::Method
                && JS_KEYWORDS.contains(&name.as_str())
            {
                continue;
            }
            let kind = if rule.promote_screaming
                && naming::classify(&name) == Some(CaseStyle::ScreamingSnake)
            {
                ConceptKind::Constant
            } else {
                rule.kind
            };
            concepts.push(Concept {
                name,
                kind,
                confidence: LEXICAL_CONFIDENCE,
                location: SourceLocation::line(idx as u32 + 1),
            });
        }
        concepts
    }
}

impl ConceptExtractor for LexicalExtractor {
    fn extract(&self, file_path: &str, content: &str) -> Result<Extraction, ExtractionError> {
        match Language::from_path(file_path) {
            Some(language) => Ok(Extraction {
                concepts: self.extract_language(language, content),
                degraded: false,
            }),
            None => Ok(Extraction::unsupported()),
        }
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

fn first_match(rules: &[Rule], line: &str) -> Option<(Rule, String)> {
    rules.iter().find_map(|rule| {
        let regex = rule.regex.as_ref()?;
        let name = regex.captures(line)?.get(1)?.as_str().to_string();
        Some((*rule, name))
    })
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(path: &str, src: &str) -> Vec<(String, ConceptKind, u32)> {
        LexicalExtractor::new()
            .extract(path, src)
            .unwrap()
            .concepts
            .into_iter()
            .map(|c| (c.name, c.kind, c.location.line_start))
            .collect()
    }

    #[test]
    fn typescript_declarations() {
        let src = "\
export function loadUser(id: string) {}
const fetchData = async (url) => {};
export class UserService {
  private findOne(id: string): User {
    if (id) {
    }
  }
}
interface UserProps {}
type UserId = string;
let user_id = 1;
const MAX_RETRIES = 3;
// const ignored = 1;
";
        assert_eq!(
            kinds("src/user.ts", src),
            vec![
                ("loadUser".to_string(), ConceptKind::Function, 1),
                ("fetchData".to_string(), ConceptKind::ArrowFunction, 2),
                ("UserService".to_string(), ConceptKind::Class, 3),
                ("findOne".to_string(), ConceptKind::Method, 4),
                ("UserProps".to_string(), ConceptKind::Interface, 9),
                ("UserId".to_string(), ConceptKind::TypeAlias, 10),
                ("user_id".to_string(), ConceptKind::Variable, 11),
                ("MAX_RETRIES".to_string(), ConceptKind::Constant, 12),
            ]
        );
    }

    #[test]
    fn python_declarations() {
        let src = "\
MAX_SIZE = 10
class UserRepo:
    def find_user(self):
        pass
def load_config():
    pass
";
        assert_eq!(
            kinds("app/repo.py", src),
            vec![
                ("MAX_SIZE".to_string(), ConceptKind::Constant, 1),
                ("UserRepo".to_string(), ConceptKind::Class, 2),
                ("find_user".to_string(), ConceptKind::Method, 3),
                ("load_config".to_string(), ConceptKind::Function, 5),
            ]
        );
    }

    #[test]
    fn rust_and_go_declarations() {
        let rs = "pub struct Store;\nimpl Store {\n    pub fn open_db() {}\n}\nconst MAX: usize = 1;\n";
        assert_eq!(
            kinds("src/lib.rs", rs),
            vec![
                ("Store".to_string(), ConceptKind::Class, 1),
                ("open_db".to_string(), ConceptKind::Method, 3),
                ("MAX".to_string(), ConceptKind::Constant, 5),
            ]
        );

        let go = "func (s *Server) HandleRequest() {}\nfunc NewServer() {}\n";
        assert_eq!(
            kinds("server.go", go),
            vec![
                ("HandleRequest".to_string(), ConceptKind::Method, 1),
                ("NewServer".to_string(), ConceptKind::Function, 2),
            ]
        );
    }

    #[test]
    fn unknown_extension_is_degraded() {
        let extraction = LexicalExtractor::new().extract("legacy/old.x", "let a = 1").unwrap();
        assert!(extraction.degraded);
        assert!(extraction.concepts.is_empty());
    }
}
