//! Language detection from file extension.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the built-in extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Java,
    Go,
    Rust,
}

impl Language {
    pub fn from_extension(ext: Option<&str>) -> Option<Language> {
        match ext? {
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            "java" => Some(Language::Java),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Detect from a (relative) file path.
    pub fn from_path(path: &str) -> Option<Language> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let ext = file_name.rsplit_once('.').map(|(_, ext)| ext);
        Self::from_extension(ext)
    }

    /// Lowercase tag used in pattern contexts (`lang:<tag>`).
    pub fn tag(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    pub fn is_js_like(&self) -> bool {
        matches!(self, Language::TypeScript | Language::JavaScript)
    }

    /// Whether single- and double-quoted string literals are interchangeable.
    pub fn has_free_quote_choice(&self) -> bool {
        matches!(self, Language::TypeScript | Language::JavaScript | Language::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
