//! Conflict detector: checks code against the stored patterns of a project.
//!
//! A check never writes to the pattern tables. All pattern and exception
//! reads of one check run inside a single read snapshot, so a concurrent
//! merge is seen either entirely or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use canon_core::config::DetectionConfig;
use canon_core::errors::DetectionError;
use canon_core::events::types::{ExceptionAddedEvent, ViolationDetectedEvent};
use canon_core::events::EventDispatcher;
use canon_core::traits::ConceptExtractor;
use canon_core::types::paths::relative_path_problem;
use canon_core::types::{normalize_path, Extraction};
use canon_storage::connection::writer::with_read_snapshot;
use canon_storage::queries::exceptions::{self, ExceptionRow};
use canon_storage::queries::patterns::{self, PatternRow};
use canon_storage::queries::violations::{self, ViolationRow};
use canon_storage::PatternStore;
use rusqlite::Connection;

use super::exceptions::ScopeCache;
use super::fixes;
use super::severity::SeverityPolicy;
use super::types::{
    ComplianceOptions, ComplianceReport, PatternException, Severity, SuggestedFix, Violation,
    ViolationRecord,
};
use crate::extraction::{observe, Language, Observation};
use crate::patterns::{Pattern, PatternContent};

/// Checks files against one project's pattern store.
pub struct ConflictDetector {
    project_id: String,
    store: Arc<PatternStore>,
    extractor: Arc<dyn ConceptExtractor>,
    policy: SeverityPolicy,
    scopes: ScopeCache,
    dispatcher: Arc<EventDispatcher>,
}

/// Stored patterns competing in one slot, dominant first.
struct SlotPatterns {
    patterns: Vec<Pattern>,
}

impl SlotPatterns {
    fn dominant(&self) -> Option<&Pattern> {
        self.patterns.first()
    }

    fn find(&self, content: &PatternContent) -> Option<&Pattern> {
        self.patterns.iter().find(|p| &p.content == content)
    }
}

/// A conflict found before exception filtering.
struct Conflict<'a> {
    observation: &'a Observation,
    pattern: Pattern,
}

impl ConflictDetector {
    pub fn new(
        project_id: impl Into<String>,
        store: Arc<PatternStore>,
        extractor: Arc<dyn ConceptExtractor>,
        config: &DetectionConfig,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            store,
            extractor,
            policy: SeverityPolicy::from_config(config),
            scopes: ScopeCache::new(config.effective_glob_cache_capacity()),
            dispatcher,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    /// Check one code unit as if it were the content of `file_path`.
    pub fn check_compliance(
        &self,
        code_unit: &str,
        file_path: &str,
        options: &ComplianceOptions,
    ) -> Result<ComplianceReport, DetectionError> {
        let started = Instant::now();
        let path = checked_path(file_path)?;
        let _span = tracing::debug_span!(
            "check_compliance",
            project_id = %self.project_id,
            file_path = %path
        )
        .entered();

        let extraction = match self.extractor.extract(&path, code_unit) {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!(
                    file_path = %path,
                    extractor = self.extractor.name(),
                    error = %e,
                    "extraction failed, checking text-level observations only"
                );
                Extraction {
                    concepts: Vec::new(),
                    degraded: true,
                }
            }
        };
        let observations = observe(&path, code_unit, &extraction);
        let language = Language::from_path(&path);

        let hits_before = self.scopes.hits();
        let (reported, suppressed) = self.store.db().with_reader(|conn| {
            with_read_snapshot(conn, |tx| {
                let slots = load_slots(tx, &observations, language)?;
                let conflicts = find_conflicts(&observations, &slots);
                self.filter_excepted(tx, &path, conflicts)
            })
        })?;

        let mut violations = Vec::new();
        for conflict in reported {
            let severity = self.policy.classify(conflict.pattern.confidence);
            if severity < options.severity_threshold {
                continue;
            }
            let suggested_fix = if options.auto_fix {
                fixes::suggest(conflict.observation, &conflict.pattern.content)
            } else {
                None
            };
            violations.push(build_violation(&path, &conflict, severity, suggested_fix));
        }
        violations.sort_by(|a, b| {
            a.line_start
                .cmp(&b.line_start)
                .then_with(|| a.pattern_id.cmp(&b.pattern_id))
        });

        if options.track_history && !violations.is_empty() {
            self.record_history(&violations)?;
        }
        for v in &violations {
            self.dispatcher.emit_violation_detected(&ViolationDetectedEvent {
                pattern_id: v.pattern_id.clone(),
                file_path: v.file_path.clone(),
                line: v.line_start,
                severity: v.severity.name().to_string(),
            });
        }

        let report = ComplianceReport {
            overall_score: self.policy.overall_score(&violations),
            file_path: path,
            violations,
            degraded: extraction.degraded,
            suppressed,
        };
        tracing::debug!(
            violations = report.violations.len(),
            suppressed = report.suppressed,
            overall_score = report.overall_score,
            degraded = report.degraded,
            compliance_check_time = started.elapsed().as_millis() as u64,
            glob_cache_hits = self.scopes.hits() - hits_before,
            "compliance check finished"
        );
        Ok(report)
    }

    /// Append an exception for `pattern_id` inside `scope_glob`.
    pub fn add_exception(
        &self,
        pattern_id: &str,
        reason: &str,
        scope_glob: &str,
    ) -> Result<PatternException, DetectionError> {
        if pattern_id.trim().is_empty() {
            return Err(DetectionError::InvalidInput("pattern id is empty".to_string()));
        }
        // Compile first so an invalid scope is never stored.
        self.scopes.matcher(scope_glob)?;

        let created_at = chrono::Utc::now().timestamp();
        let id = self.store.db().with_writer(|conn| {
            exceptions::insert_exception(conn, pattern_id, scope_glob, reason, created_at)
        })?;
        tracing::info!(
            project_id = %self.project_id,
            pattern_id,
            scope_glob,
            "exception added"
        );
        self.dispatcher.emit_exception_added(&ExceptionAddedEvent {
            project_id: self.project_id.clone(),
            pattern_id: pattern_id.to_string(),
            scope_glob: scope_glob.to_string(),
        });
        Ok(PatternException {
            id,
            pattern_id: pattern_id.to_string(),
            scope_glob: scope_glob.to_string(),
            reason: reason.to_string(),
            created_at,
        })
    }

    /// Whether any exception for `pattern_id` covers `file_path`.
    pub fn is_excepted(&self, pattern_id: &str, file_path: &str) -> Result<bool, DetectionError> {
        let path = checked_path(file_path)?;
        let rows = self
            .store
            .db()
            .with_reader(|conn| exceptions::exceptions_for_pattern(conn, pattern_id))?;
        self.any_scope_matches(&rows, &path)
    }

    /// Exceptions recorded for a pattern, oldest first.
    pub fn exceptions(&self, pattern_id: &str) -> Result<Vec<PatternException>, DetectionError> {
        let rows = self
            .store
            .db()
            .with_reader(|conn| exceptions::exceptions_for_pattern(conn, pattern_id))?;
        Ok(rows.into_iter().map(exception_from_row).collect())
    }

    /// Tracked violations of a file, most recent check first.
    pub fn violation_history(&self, file_path: &str) -> Result<Vec<ViolationRecord>, DetectionError> {
        let path = checked_path(file_path)?;
        let rows = self
            .store
            .db()
            .with_reader(|conn| violations::violations_for_file(conn, &path))?;
        Ok(rows.into_iter().filter_map(record_from_row).collect())
    }

    fn filter_excepted<'a>(
        &self,
        conn: &Connection,
        path: &str,
        conflicts: Vec<Conflict<'a>>,
    ) -> Result<(Vec<Conflict<'a>>, u32), canon_core::errors::StorageError> {
        let mut by_pattern: BTreeMap<String, bool> = BTreeMap::new();
        let mut kept = Vec::with_capacity(conflicts.len());
        let mut suppressed = 0u32;

        for conflict in conflicts {
            let id = &conflict.pattern.pattern_id;
            let excepted = match by_pattern.get(id) {
                Some(excepted) => *excepted,
                None => {
                    let rows = exceptions::exceptions_for_pattern(conn, id)?;
                    // Stored scopes were validated on insert; one that no
                    // longer compiles covers nothing.
                    let excepted = self.any_scope_matches(&rows, path).unwrap_or(false);
                    by_pattern.insert(id.clone(), excepted);
                    excepted
                }
            };
            if excepted {
                suppressed += 1;
            } else {
                kept.push(conflict);
            }
        }
        Ok((kept, suppressed))
    }

    fn any_scope_matches(&self, rows: &[ExceptionRow], path: &str) -> Result<bool, DetectionError> {
        for row in rows {
            if self.scopes.matches(&row.scope_glob, path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn record_history(&self, violations: &[Violation]) -> Result<(), DetectionError> {
        let checked_at = chrono::Utc::now().timestamp();
        let rows: Vec<ViolationRow> = violations
            .iter()
            .map(|v| ViolationRow {
                pattern_id: v.pattern_id.clone(),
                file_path: v.file_path.clone(),
                line_start: i64::from(v.line_start),
                line_end: i64::from(v.line_end),
                severity: v.severity.name().to_string(),
                message: v.message.clone(),
                suggested_fix: v
                    .suggested_fix
                    .as_ref()
                    .and_then(|fix| serde_json::to_string(fix).ok()),
                checked_at,
            })
            .collect();
        self.store
            .db()
            .with_writer(|conn| violations::insert_violations(conn, &rows))?;
        Ok(())
    }
}

fn checked_path(file_path: &str) -> Result<String, DetectionError> {
    let path = normalize_path(file_path);
    match relative_path_problem(&path) {
        Some(problem) => Err(DetectionError::InvalidInput(format!("{file_path}: {problem}"))),
        None => Ok(path),
    }
}

/// Load the applicable stored patterns of every slot the observations touch.
fn load_slots(
    conn: &Connection,
    observations: &[Observation],
    language: Option<Language>,
) -> Result<BTreeMap<String, SlotPatterns>, canon_core::errors::StorageError> {
    let mut slots = BTreeMap::new();
    for observation in observations {
        let slot = observation.content.slot();
        if slots.contains_key(&slot) {
            continue;
        }
        let rows: Vec<PatternRow> = patterns::patterns_in_slot(conn, &slot)?;
        let mut applicable = Vec::with_capacity(rows.len());
        for row in &rows {
            let pattern = Pattern::from_row(row)?;
            if applies_to(&pattern, language) {
                applicable.push(pattern);
            }
        }
        slots.insert(slot, SlotPatterns { patterns: applicable });
    }
    Ok(slots)
}

/// A pattern tagged with languages applies only to files of those languages.
fn applies_to(pattern: &Pattern, language: Option<Language>) -> bool {
    let languages = pattern.languages();
    if languages.is_empty() {
        return true;
    }
    language.is_some_and(|lang| languages.iter().any(|l| l == lang.tag()))
}

/// An observation conflicts when its slot's dominant pattern says otherwise
/// and the observed alternative is not equally established.
fn find_conflicts<'a>(
    observations: &'a [Observation],
    slots: &BTreeMap<String, SlotPatterns>,
) -> Vec<Conflict<'a>> {
    let mut conflicts = Vec::new();
    for observation in observations {
        let Some(slot) = slots.get(&observation.content.slot()) else {
            continue;
        };
        let Some(dominant) = slot.dominant() else {
            continue;
        };
        if dominant.content == observation.content {
            continue;
        }
        if slot
            .find(&observation.content)
            .is_some_and(|observed| observed.frequency >= dominant.frequency)
        {
            continue;
        }
        conflicts.push(Conflict {
            observation,
            pattern: dominant.clone(),
        });
    }
    conflicts
}

fn build_violation(
    path: &str,
    conflict: &Conflict<'_>,
    severity: Severity,
    suggested_fix: Option<SuggestedFix>,
) -> Violation {
    let expected = conflict.pattern.content.describe();
    let message = match conflict.observation.subject.as_deref() {
        Some(subject) => format!(
            "'{subject}' deviates from the project convention: {expected} (confidence {:.0}%)",
            conflict.pattern.confidence * 100.0
        ),
        None => format!(
            "Deviates from the project convention: {expected} (confidence {:.0}%)",
            conflict.pattern.confidence * 100.0
        ),
    };
    Violation {
        pattern_id: conflict.pattern.pattern_id.clone(),
        file_path: path.to_string(),
        line_start: conflict.observation.line,
        line_end: conflict.observation.line,
        severity,
        confidence: conflict.pattern.confidence,
        message,
        suggested_fix,
    }
}

fn exception_from_row(row: ExceptionRow) -> PatternException {
    PatternException {
        id: row.id,
        pattern_id: row.pattern_id,
        scope_glob: row.scope_glob,
        reason: row.reason,
        created_at: row.created_at,
    }
}

fn record_from_row(row: ViolationRow) -> Option<ViolationRecord> {
    let severity = Severity::from_name(&row.severity)?;
    Some(ViolationRecord {
        violation: Violation {
            pattern_id: row.pattern_id,
            file_path: row.file_path,
            line_start: u32::try_from(row.line_start).unwrap_or(0),
            line_end: u32::try_from(row.line_end).unwrap_or(0),
            severity,
            confidence: 0.0,
            message: row.message,
            suggested_fix: row
                .suggested_fix
                .and_then(|json| serde_json::from_str(&json).ok()),
        },
        checked_at: row.checked_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{pattern_id, CaseStyle, PatternType};
    use canon_core::types::ConceptKind;

    fn stored(style: CaseStyle, frequency: u64, contexts: &[&str]) -> Pattern {
        let content = PatternContent::naming(ConceptKind::Variable, style);
        Pattern {
            pattern_id: pattern_id(&content),
            pattern_type: PatternType::Naming,
            content,
            frequency,
            baseline: frequency,
            confidence: 0.88,
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
            examples: Vec::new(),
            version: 1,
            created_at: 0,
            last_seen: 0,
        }
    }

    fn observed(style: CaseStyle) -> Observation {
        Observation {
            content: PatternContent::naming(ConceptKind::Variable, style),
            line: 1,
            snippet: String::new(),
            subject: Some("user_id".into()),
        }
    }

    fn slots(patterns: Vec<Pattern>) -> BTreeMap<String, SlotPatterns> {
        let mut map = BTreeMap::new();
        map.insert("naming:variable".to_string(), SlotPatterns { patterns });
        map
    }

    #[test]
    fn deviation_from_dominant_conflicts() {
        let obs = [observed(CaseStyle::Snake)];
        let conflicts = find_conflicts(&obs, &slots(vec![stored(CaseStyle::Camel, 10, &[])]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].pattern.content, PatternContent::naming(ConceptKind::Variable, CaseStyle::Camel));
    }

    #[test]
    fn matching_or_tied_alternative_does_not_conflict() {
        let obs = [observed(CaseStyle::Camel)];
        assert!(find_conflicts(&obs, &slots(vec![stored(CaseStyle::Camel, 10, &[])])).is_empty());

        let obs = [observed(CaseStyle::Snake)];
        let tied = vec![stored(CaseStyle::Camel, 4, &[]), stored(CaseStyle::Snake, 4, &[])];
        assert!(find_conflicts(&obs, &slots(tied)).is_empty());
    }

    #[test]
    fn empty_slot_has_no_conflicts() {
        let obs = [observed(CaseStyle::Snake)];
        assert!(find_conflicts(&obs, &slots(Vec::new())).is_empty());
    }

    #[test]
    fn language_tags_limit_applicability() {
        let ts_only = stored(CaseStyle::Camel, 3, &["src/", "lang:typescript"]);
        assert!(applies_to(&ts_only, Some(Language::TypeScript)));
        assert!(!applies_to(&ts_only, Some(Language::Python)));
        assert!(!applies_to(&ts_only, None));

        let untagged = stored(CaseStyle::Camel, 3, &["src/"]);
        assert!(applies_to(&untagged, None));
    }

    #[test]
    fn checked_path_normalizes_and_rejects() {
        assert_eq!(checked_path("./src\\a.ts").unwrap(), "src/a.ts");
        assert!(matches!(
            checked_path("../a.ts"),
            Err(DetectionError::InvalidInput(_))
        ));
    }
}
