//! Exception scope matching with a compiled-glob cache.
//!
//! A scope without glob metacharacters is a path prefix: `legacy` covers
//! `legacy` itself and everything under `legacy/`. Any other scope is a glob
//! matched with `*` confined to one path segment and `**` crossing segments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use canon_core::errors::DetectionError;
use canon_core::types::normalize_path;
use canon_core::types::paths::relative_path_problem;
use glob::{MatchOptions, Pattern};
use moka::sync::Cache;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled exception scope.
#[derive(Debug, Clone)]
pub enum ScopeMatcher {
    Prefix(String),
    Glob(Pattern),
}

impl ScopeMatcher {
    /// Compile a scope. Rejects empty scopes, scopes that escape the project
    /// root and malformed globs.
    pub fn compile(scope: &str) -> Result<Self, DetectionError> {
        let normalized = normalize_path(scope);
        if let Some(problem) = relative_path_problem(&normalized) {
            return Err(DetectionError::InvalidGlob {
                glob: scope.to_string(),
                message: problem.to_string(),
            });
        }
        if !is_glob(&normalized) {
            return Ok(Self::Prefix(normalized));
        }
        Pattern::new(&normalized)
            .map(Self::Glob)
            .map_err(|e| DetectionError::InvalidGlob {
                glob: scope.to_string(),
                message: e.to_string(),
            })
    }

    /// Whether a normalized project-relative path falls inside the scope.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::Glob(pattern) => pattern.matches_with(path, MATCH_OPTIONS),
        }
    }
}

fn is_glob(scope: &str) -> bool {
    scope.contains(['*', '?', '['])
}

/// Compiled scope matchers keyed by scope text.
pub struct ScopeCache {
    cache: Cache<String, Arc<ScopeMatcher>>,
    hits: AtomicU64,
}

impl ScopeCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
            hits: AtomicU64::new(0),
        }
    }

    /// Compiled matcher for `scope`, compiling and caching it on a miss.
    pub fn matcher(&self, scope: &str) -> Result<Arc<ScopeMatcher>, DetectionError> {
        if let Some(matcher) = self.cache.get(scope) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(matcher);
        }
        let matcher = Arc::new(ScopeMatcher::compile(scope)?);
        self.cache.insert(scope.to_string(), Arc::clone(&matcher));
        Ok(matcher)
    }

    pub fn matches(&self, scope: &str, path: &str) -> Result<bool, DetectionError> {
        Ok(self.matcher(scope)?.matches(path))
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_scope_is_a_directory_prefix() {
        let m = ScopeMatcher::compile("legacy").unwrap();
        assert!(m.matches("legacy"));
        assert!(m.matches("legacy/old.x"));
        assert!(m.matches("legacy/deep/old.x"));
        assert!(!m.matches("legacy_new/a.ts"));
        assert!(!m.matches("src/legacy/a.ts"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let m = ScopeMatcher::compile("legacy/**").unwrap();
        assert!(m.matches("legacy/old.x"));
        assert!(m.matches("legacy/a/b/c.ts"));
        assert!(!m.matches("src/legacy.ts"));
    }

    #[test]
    fn single_star_stays_in_segment() {
        let m = ScopeMatcher::compile("src/*.ts").unwrap();
        assert!(m.matches("src/a.ts"));
        assert!(!m.matches("src/nested/a.ts"));
    }

    #[test]
    fn scope_is_normalized() {
        let m = ScopeMatcher::compile("./legacy/").unwrap();
        assert!(m.matches("legacy/old.x"));
    }

    #[test]
    fn invalid_scopes_are_rejected() {
        assert!(matches!(
            ScopeMatcher::compile(""),
            Err(DetectionError::InvalidGlob { .. })
        ));
        assert!(matches!(
            ScopeMatcher::compile("../outside/**"),
            Err(DetectionError::InvalidGlob { .. })
        ));
        assert!(matches!(
            ScopeMatcher::compile("src/[a"),
            Err(DetectionError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn cache_counts_hits() {
        let cache = ScopeCache::new(16);
        assert!(cache.matches("legacy/**", "legacy/a.ts").unwrap());
        assert_eq!(cache.hits(), 0);
        assert!(!cache.matches("legacy/**", "src/a.ts").unwrap());
        assert_eq!(cache.hits(), 1);
    }
}
