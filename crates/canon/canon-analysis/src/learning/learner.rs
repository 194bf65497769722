//! Incremental learner: turns change batches into atomic pattern store merges.
//!
//! Extraction runs before the merge transaction and never holds the write
//! lock. The merge itself is one `BEGIN IMMEDIATE` transaction that replaces
//! the touched files' concepts and evidence, recomputes every pattern those
//! rows corroborate, advances the store version and logs the delta. A failed
//! merge rolls back completely.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use canon_core::config::{CanonConfig, LearningConfig};
use canon_core::errors::{CanonErrorCode, LearnError, StorageError};
use canon_core::events::types::{
    DeltaAppliedEvent, DeltaDiscardedEvent, PatternDiscoveredEvent, PatternRemovedEvent,
};
use canon_core::events::EventDispatcher;
use canon_core::traits::{ConceptExtractor, SourceReader};
use canon_core::types::paths::{parent_dir, relative_path_problem};
use canon_core::types::{
    normalize_path, ChangeKind, Concept, FileChange, FxHashMap, FxHashSet, SmallVec4,
};
use canon_storage::connection::writer::with_immediate_transaction;
use canon_storage::queries::concepts::{self, ConceptRow};
use canon_storage::queries::deltas::{self, DeltaOperationRow, OP_REMOVE, OP_UPSERT};
use canon_storage::queries::evidence::{self, EvidenceRow};
use canon_storage::queries::files::{self, TrackedFileRow};
use canon_storage::queries::tombstones::{self, TombstoneRow};
use canon_storage::queries::{patterns, store_meta};
use canon_storage::PatternStore;
use rayon::prelude::*;
use rusqlite::Connection;
use xxhash_rust::xxh3::xxh3_64;

use super::relearning::{determine_mode, LearningMode};
use super::types::{ChangeBatch, LearningDelta, OriginContext, PatternSeed};
use crate::extraction::{observe, Language, Observation};
use crate::patterns::types::to_json;
use crate::patterns::{pattern_id, ConfidencePolicy, Pattern, PatternContent, PatternExample};

/// Most contexts kept on one pattern.
const MAX_CONTEXTS: usize = 32;

/// Learns patterns for one project from batches of file changes.
pub struct IncrementalLearner {
    project_id: String,
    store: Arc<PatternStore>,
    extractor: Arc<dyn ConceptExtractor>,
    reader: Arc<dyn SourceReader>,
    config: LearningConfig,
    max_batch_files: usize,
    policy: ConfidencePolicy,
    dispatcher: Arc<EventDispatcher>,
}

/// Result of reading and extracting one changed file.
enum Extracted {
    Analyzed(AnalyzedFile),
    /// Content hash matches the tracked file; nothing to do.
    Unchanged,
    /// Reading or extraction failed; the file keeps its previous rows.
    Failed(String),
}

struct AnalyzedFile {
    language: Option<Language>,
    content_hash: String,
    concepts: Vec<Concept>,
    observations: Vec<Observation>,
    degraded: bool,
}

/// One step of a merge, in batch order.
enum FileOp {
    Extract {
        path: String,
        revision: Option<String>,
        outcome: Extracted,
    },
    Delete {
        path: String,
    },
    Rename {
        from: String,
        to: String,
        revision: Option<String>,
    },
}

#[derive(Default)]
struct ConceptCounts {
    added: u32,
    modified: u32,
    removed: u32,
}

/// Pattern-level result of a committed merge, used for events.
struct MergeOutcome {
    delta: LearningDelta,
    discovered: Vec<Pattern>,
    removed: Vec<String>,
}

impl IncrementalLearner {
    pub fn new(
        project_id: impl Into<String>,
        store: Arc<PatternStore>,
        extractor: Arc<dyn ConceptExtractor>,
        reader: Arc<dyn SourceReader>,
        config: &CanonConfig,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            store,
            extractor,
            reader,
            policy: ConfidencePolicy::from_config(&config.learning),
            config: config.learning.clone(),
            max_batch_files: config.workers.effective_max_batch_files(),
            dispatcher,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn store(&self) -> &Arc<PatternStore> {
        &self.store
    }

    pub fn extractor(&self) -> &Arc<dyn ConceptExtractor> {
        &self.extractor
    }

    /// Apply one batch of changes as a single atomic merge.
    ///
    /// An empty batch, or one whose files are all unchanged, returns a no-op
    /// delta (`resulting_version == preceding_version`) and logs nothing.
    pub fn process_changes(
        &self,
        batch: &ChangeBatch,
        origin: &OriginContext,
    ) -> Result<LearningDelta, LearnError> {
        let started = Instant::now();
        let changes = self.validate(batch)?;
        let _span = tracing::info_span!(
            "process_changes",
            project_id = %self.project_id,
            trigger = origin.trigger.name(),
            files = changes.len()
        )
        .entered();

        if origin.is_cancelled() {
            return Err(LearnError::Cancelled);
        }
        if changes.is_empty() {
            let version = self.store.current_version()?;
            return Ok(self.noop_delta(origin, version, LearningMode::Skip, started));
        }

        let _merge = self.store.lock_merge()?;
        let (preceding, tracked_total, tracked) = self.read_tracked(&changes)?;
        let mode = determine_mode(
            changes.len() as u64,
            tracked_total,
            self.config.effective_relearn_threshold(),
        );

        let extraction_started = Instant::now();
        let ops = self.plan(changes, &tracked, origin);
        tracing::debug!(
            files_extracted = ops
                .iter()
                .filter(|op| matches!(op, FileOp::Extract { outcome: Extracted::Analyzed(_), .. }))
                .count(),
            extraction_duration = extraction_started.elapsed().as_millis() as u64,
            "extraction finished"
        );

        // A started merge always completes; cancellation is honored up to here.
        if origin.is_cancelled() {
            return Err(LearnError::Cancelled);
        }

        let degraded_files = degraded_paths(&ops);
        let any_work = ops.iter().any(|op| !matches!(op, FileOp::Extract { outcome: Extracted::Unchanged | Extracted::Failed(_), .. }));
        if !any_work {
            let mut delta = self.noop_delta(origin, preceding, LearningMode::Skip, started);
            delta.partial_degradation = !degraded_files.is_empty();
            delta.degraded_files = degraded_files;
            return Ok(delta);
        }

        let merge_started = Instant::now();
        let result = self.store.db().with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                self.merge(tx, &ops, origin, mode, preceding, &degraded_files, started)
            })
        });

        match result {
            Ok(outcome) => {
                tracing::info!(
                    merge_duration = merge_started.elapsed().as_millis() as u64,
                    degraded_files = outcome.delta.degraded_files.len(),
                    resulting_version = outcome.delta.resulting_version,
                    mode = outcome.delta.mode.name(),
                    "delta applied"
                );
                self.emit_applied(&outcome);
                Ok(outcome.delta)
            }
            Err(source) => Err(self.discard(preceding, source)),
        }
    }

    /// Merge externally learned patterns into the store as one logged delta.
    ///
    /// Each seed's frequency becomes the pattern's baseline; evidence already
    /// in the store is added on top. Confidence never drops below what is
    /// stored.
    pub fn import_patterns(&self, seeds: &[PatternSeed]) -> Result<LearningDelta, LearnError> {
        let started = Instant::now();
        let origin = OriginContext::manual();
        for seed in seeds {
            if !(0.0..=1.0).contains(&seed.confidence) {
                return Err(LearnError::InvalidBatch {
                    reason: format!("seed confidence {} outside [0, 1]", seed.confidence),
                });
            }
        }
        if seeds.is_empty() {
            let version = self.store.current_version()?;
            return Ok(self.noop_delta(&origin, version, LearningMode::Skip, started));
        }

        let _merge = self.store.lock_merge()?;
        let preceding = self.store.current_version()?;
        let result = self.store.db().with_writer(|conn| {
            with_immediate_transaction(conn, |tx| self.merge_seeds(tx, seeds, preceding, started))
        });

        match result {
            Ok(outcome) => {
                tracing::info!(
                    project_id = %self.project_id,
                    seeds = seeds.len(),
                    resulting_version = outcome.delta.resulting_version,
                    "patterns imported"
                );
                self.emit_applied(&outcome);
                Ok(outcome.delta)
            }
            Err(source) => Err(self.discard(preceding, source)),
        }
    }

    /// All stored patterns ordered by id.
    pub fn patterns(&self) -> Result<Vec<Pattern>, LearnError> {
        let rows = self.store.db().with_reader(patterns::list_patterns)?;
        rows.iter()
            .map(Pattern::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LearnError::from)
    }

    pub fn pattern(&self, pattern_id: &str) -> Result<Option<Pattern>, LearnError> {
        let row = self
            .store
            .db()
            .with_reader(|conn| patterns::get_pattern(conn, pattern_id))?;
        Ok(row.as_ref().map(Pattern::from_row).transpose()?)
    }

    /// Logged deltas ordered by resulting version.
    pub fn delta_history(&self) -> Result<Vec<LearningDelta>, LearnError> {
        let rows = self.store.db().with_reader(deltas::list_deltas)?;
        rows.iter()
            .map(LearningDelta::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LearnError::from)
    }

    // ---- Validation and planning ----

    /// Normalize paths, reject malformed changes and coalesce duplicates
    /// (last change to a path wins, at the position of its first occurrence).
    ///
    /// A rename cannot be coalesced away. Renaming a file with a pending edit,
    /// or changing a file after renaming it, becomes a delete of the source
    /// path plus a fresh read of the target.
    fn validate(&self, batch: &ChangeBatch) -> Result<Vec<FileChange>, LearnError> {
        let mut slots = CoalescedChanges::with_capacity(batch.len());

        for raw in &batch.changes {
            let mut change = raw.clone();
            change.path = checked_path(&change.path)?;
            if change.kind == ChangeKind::Renamed {
                let previous = change.previous_path.as_deref().ok_or_else(|| {
                    LearnError::InvalidBatch {
                        reason: format!("rename of {} has no previous path", change.path),
                    }
                })?;
                let previous = checked_path(previous)?;
                if previous == change.path {
                    change.kind = ChangeKind::Modified;
                    change.previous_path = None;
                } else {
                    change.previous_path = Some(previous);
                }
            } else {
                change.previous_path = None;
            }

            if let Some(from) = slots.pending_rename_source(&change.path) {
                slots.place(FileChange::deleted(from));
            }
            if change.kind == ChangeKind::Renamed {
                let from = change.previous_path.clone().unwrap_or_default();
                if slots.has_pending_edit(&from) {
                    slots.place(FileChange::deleted(from));
                    change.kind = ChangeKind::Added;
                    change.previous_path = None;
                }
            }
            slots.place(change);
        }

        let changes = slots.into_changes();
        if changes.len() > self.max_batch_files {
            return Err(LearnError::InvalidBatch {
                reason: format!(
                    "batch has {} files, limit is {}",
                    changes.len(),
                    self.max_batch_files
                ),
            });
        }
        Ok(changes)
    }

    /// Store version, tracked file count and the tracked rows for every path
    /// the batch mentions. Read under the merge lock, so stable until commit.
    fn read_tracked(
        &self,
        changes: &[FileChange],
    ) -> Result<(u64, u64, FxHashMap<String, TrackedFileRow>), StorageError> {
        self.store.db().with_reader(|conn| {
            let version = store_meta::current_version(conn)?.max(0) as u64;
            let total = files::count_tracked_files(conn)?.max(0) as u64;
            let mut tracked = FxHashMap::default();
            for change in changes {
                let paths = std::iter::once(change.path.as_str()).chain(change.previous_path.as_deref());
                for path in paths {
                    if let Some(row) = files::get_tracked_file(conn, path)? {
                        tracked.insert(path.to_string(), row);
                    }
                }
            }
            Ok((version, total, tracked))
        })
    }

    /// Turn changes into merge steps, extracting every file that needs it.
    fn plan(
        &self,
        changes: Vec<FileChange>,
        tracked: &FxHashMap<String, TrackedFileRow>,
        origin: &OriginContext,
    ) -> Vec<FileOp> {
        let to_extract: Vec<&str> = changes
            .iter()
            .filter(|c| match c.kind {
                ChangeKind::Added | ChangeKind::Modified => true,
                ChangeKind::Renamed => c
                    .previous_path
                    .as_ref()
                    .is_some_and(|from| !tracked.contains_key(from)),
                ChangeKind::Deleted => false,
            })
            .map(|c| c.path.as_str())
            .collect();

        let extract_one = |path: &&str| (path.to_string(), self.extract_file(path, tracked.get(*path)));
        let mut outcomes: FxHashMap<String, Extracted> =
            if self.config.effective_parallel_extraction() && to_extract.len() > 1 {
                to_extract.par_iter().map(extract_one).collect()
            } else {
                to_extract.iter().map(extract_one).collect()
            };

        let mut ops = Vec::with_capacity(changes.len());
        for change in changes {
            let revision = change.revision.clone().or_else(|| origin.revision.clone());
            match change.kind {
                ChangeKind::Deleted => ops.push(FileOp::Delete { path: change.path }),
                ChangeKind::Renamed if !outcomes.contains_key(&change.path) => {
                    if let Some(from) = change.previous_path {
                        ops.push(FileOp::Rename {
                            from,
                            to: change.path,
                            revision,
                        });
                    }
                }
                _ => {
                    let outcome = outcomes
                        .remove(&change.path)
                        .unwrap_or_else(|| Extracted::Failed("file was not extracted".to_string()));
                    ops.push(FileOp::Extract {
                        path: change.path,
                        revision,
                        outcome,
                    });
                }
            }
        }
        ops
    }

    fn extract_file(&self, path: &str, tracked: Option<&TrackedFileRow>) -> Extracted {
        let content = match self.reader.read(self.store.root(), path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path, error = %e, "source read failed, file flagged degraded");
                return Extracted::Failed(e.to_string());
            }
        };
        let content_hash = format!("{:016x}", xxh3_64(content.as_bytes()));
        if tracked.is_some_and(|t| t.content_hash == content_hash && !t.degraded) {
            return Extracted::Unchanged;
        }

        match self.extractor.extract(path, &content) {
            Ok(extraction) => {
                let observations = observe(path, &content, &extraction);
                Extracted::Analyzed(AnalyzedFile {
                    language: Language::from_path(path),
                    content_hash,
                    degraded: extraction.degraded,
                    concepts: extraction.concepts,
                    observations,
                })
            }
            Err(e) => {
                tracing::warn!(
                    path,
                    extractor = self.extractor.name(),
                    error = %e,
                    "extraction failed, file flagged degraded"
                );
                Extracted::Failed(e.to_string())
            }
        }
    }

    // ---- Merge ----

    #[allow(clippy::too_many_arguments)]
    fn merge(
        &self,
        tx: &Connection,
        ops: &[FileOp],
        origin: &OriginContext,
        mode: LearningMode,
        expected_preceding: u64,
        degraded_files: &[String],
        started: Instant,
    ) -> Result<MergeOutcome, StorageError> {
        let preceding = store_meta::current_version(tx)?.max(0) as u64;
        if preceding != expected_preceding {
            return Err(StorageError::ConsistencyViolation {
                expected: expected_preceding,
                found: preceding,
            });
        }
        let next = preceding + 1;
        let now = chrono::Utc::now().timestamp();

        let mut touched: BTreeSet<String> = BTreeSet::new();
        let mut gained: FxHashSet<String> = FxHashSet::default();
        let mut new_contents: FxHashMap<String, PatternContent> = FxHashMap::default();
        let mut counts = ConceptCounts::default();
        let mut files_touched = 0u32;

        for op in ops {
            match op {
                FileOp::Extract {
                    path,
                    revision,
                    outcome: Extracted::Analyzed(file),
                } => {
                    files_touched += 1;
                    let old_concepts = concepts::concepts_for_file(tx, path)?;
                    diff_concepts(&old_concepts, &file.concepts, &mut counts);
                    clear_file(tx, path, &mut touched)?;

                    let concept_rows: Vec<ConceptRow> =
                        file.concepts.iter().map(|c| concept_row(path, c)).collect();
                    concepts::insert_concepts(tx, &concept_rows)?;

                    let mut evidence_rows = Vec::with_capacity(file.observations.len());
                    for observation in &file.observations {
                        let id = pattern_id(&observation.content);
                        touched.insert(id.clone());
                        gained.insert(id.clone());
                        new_contents
                            .entry(id.clone())
                            .or_insert_with(|| observation.content.clone());
                        evidence_rows.push(EvidenceRow {
                            pattern_id: id,
                            file_path: path.clone(),
                            line: i64::from(observation.line),
                            snippet: observation.snippet.clone(),
                        });
                    }
                    evidence::insert_evidence(tx, &evidence_rows)?;

                    files::upsert_tracked_file(
                        tx,
                        &TrackedFileRow {
                            file_path: path.clone(),
                            language: file.language.map(|l| l.tag().to_string()),
                            content_hash: file.content_hash.clone(),
                            degraded: file.degraded,
                            analyzed_at: now,
                            revision: revision.clone(),
                        },
                    )?;
                }
                FileOp::Extract { .. } => {}
                FileOp::Delete { path } => {
                    let old_concepts = concepts::concepts_for_file(tx, path)?;
                    let was_tracked = files::delete_tracked_file(tx, path)? > 0;
                    if was_tracked || !old_concepts.is_empty() {
                        files_touched += 1;
                    }
                    counts.removed += old_concepts.len() as u32;
                    clear_file(tx, path, &mut touched)?;
                }
                FileOp::Rename { from, to, revision } => {
                    files_touched += 1;
                    // Whatever was tracked at the target is replaced by the moved file.
                    counts.removed += concepts::concepts_for_file(tx, to)?.len() as u32;
                    clear_file(tx, to, &mut touched)?;
                    files::delete_tracked_file(tx, to)?;

                    for row in evidence::evidence_for_file(tx, from)? {
                        touched.insert(row.pattern_id);
                    }
                    concepts::rekey_concepts(tx, from, to)?;
                    evidence::rekey_evidence(tx, from, to)?;
                    files::rekey_tracked_file(tx, from, to)?;
                    if let Some(mut row) = files::get_tracked_file(tx, to)? {
                        row.revision = revision.clone().or(row.revision);
                        files::upsert_tracked_file(tx, &row)?;
                    }
                }
            }
        }

        if mode == LearningMode::Full {
            for row in patterns::list_patterns(tx)? {
                touched.insert(row.pattern_id);
            }
        }

        let mut recorder = OperationRecorder::new(next);
        for id in &touched {
            self.recompute_pattern(tx, id, &new_contents, gained.contains(id), next, now, &mut recorder)?;
        }

        let mut delta = LearningDelta {
            id: uuid::Uuid::new_v4().to_string(),
            trigger: origin.trigger,
            mode,
            revision: origin
                .revision
                .clone()
                .or_else(|| last_revision(ops)),
            files_touched,
            concepts_added: counts.added,
            concepts_modified: counts.modified,
            concepts_removed: counts.removed,
            patterns_added: recorder.added,
            patterns_modified: recorder.modified,
            patterns_removed: recorder.removed.len() as u32,
            duration_ms: 0,
            applied_at: now,
            preceding_version: preceding,
            resulting_version: preceding,
            partial_degradation: !degraded_files.is_empty(),
            degraded_files: degraded_files.to_vec(),
        };

        if files_touched == 0 && recorder.is_empty() {
            delta.mode = LearningMode::Skip;
            delta.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(MergeOutcome {
                delta,
                discovered: Vec::new(),
                removed: Vec::new(),
            });
        }

        store_meta::advance_version(tx, preceding as i64, next as i64)?;
        delta.resulting_version = next;
        delta.duration_ms = started.elapsed().as_millis() as u64;
        deltas::insert_delta(tx, &delta.to_row()?)?;
        recorder.flush(tx)?;

        Ok(MergeOutcome {
            delta,
            discovered: recorder.discovered,
            removed: recorder.removed,
        })
    }

    /// Recompute one pattern's derived fields from its evidence and write it
    /// back if anything changed. Frequency zero removes it.
    #[allow(clippy::too_many_arguments)]
    fn recompute_pattern(
        &self,
        tx: &Connection,
        id: &str,
        new_contents: &FxHashMap<String, PatternContent>,
        gained_evidence: bool,
        version: u64,
        now: i64,
        recorder: &mut OperationRecorder,
    ) -> Result<(), StorageError> {
        let existing = patterns::get_pattern(tx, id)?
            .as_ref()
            .map(Pattern::from_row)
            .transpose()?;
        let baseline = existing.as_ref().map_or(0, |p| p.baseline);
        let frequency = baseline + evidence::count_for_pattern(tx, id)?.max(0) as u64;

        if frequency == 0 {
            if let Some(pattern) = existing {
                remove_pattern(tx, &pattern, version, now)?;
                recorder.remove(pattern.pattern_id);
            }
            return Ok(());
        }

        let content = match (&existing, new_contents.get(id)) {
            (Some(p), _) => p.content.clone(),
            (None, Some(content)) => content.clone(),
            (None, None) => return Ok(()),
        };
        let last_seen = match &existing {
            Some(p) if !gained_evidence => p.last_seen,
            _ => now,
        };
        let computed = self.policy.score(frequency, last_seen, now);
        let confidence = match &existing {
            Some(p) if frequency >= p.frequency => ConfidencePolicy::corroborate(p.confidence, computed),
            _ => computed,
        };

        let examples = evidence::examples_for_pattern(tx, id, self.config.effective_max_examples())?
            .into_iter()
            .map(|row| PatternExample {
                file_path: row.file_path,
                line: row.line.clamp(0, i64::from(u32::MAX)) as u32,
                snippet: row.snippet,
            })
            .collect();
        let carried = existing
            .as_ref()
            .filter(|p| p.baseline > 0)
            .map(|p| p.contexts.as_slice())
            .unwrap_or_default();
        let contexts = build_contexts(evidence::files_for_pattern(tx, id)?, carried);

        let candidate = Pattern {
            pattern_id: id.to_string(),
            pattern_type: content.pattern_type(),
            content,
            frequency,
            baseline,
            confidence,
            contexts,
            examples,
            version,
            created_at: existing.as_ref().map_or(now, |p| p.created_at),
            last_seen,
        };

        if let Some(previous) = &existing {
            if same_derived_fields(previous, &candidate) {
                return Ok(());
            }
        }
        patterns::upsert_pattern(tx, &candidate.to_row()?)?;
        recorder.upsert(candidate, existing.is_none())?;
        Ok(())
    }

    fn merge_seeds(
        &self,
        tx: &Connection,
        seeds: &[PatternSeed],
        expected_preceding: u64,
        started: Instant,
    ) -> Result<MergeOutcome, StorageError> {
        let preceding = store_meta::current_version(tx)?.max(0) as u64;
        if preceding != expected_preceding {
            return Err(StorageError::ConsistencyViolation {
                expected: expected_preceding,
                found: preceding,
            });
        }
        let next = preceding + 1;
        let now = chrono::Utc::now().timestamp();
        let mut recorder = OperationRecorder::new(next);

        for seed in seeds {
            let id = pattern_id(&seed.content);
            let existing = patterns::get_pattern(tx, &id)?
                .as_ref()
                .map(Pattern::from_row)
                .transpose()?;
            let frequency = seed.frequency + evidence::count_for_pattern(tx, &id)?.max(0) as u64;
            if frequency == 0 {
                continue;
            }
            let confidence = existing
                .as_ref()
                .map_or(seed.confidence, |p| ConfidencePolicy::corroborate(p.confidence, seed.confidence));
            let mut contexts: BTreeSet<String> = seed.contexts.iter().cloned().collect();
            if let Some(p) = &existing {
                contexts.extend(p.contexts.iter().cloned());
            }
            let examples = evidence::examples_for_pattern(tx, &id, self.config.effective_max_examples())?
                .into_iter()
                .map(|row| PatternExample {
                    file_path: row.file_path,
                    line: row.line.clamp(0, i64::from(u32::MAX)) as u32,
                    snippet: row.snippet,
                })
                .collect();

            let candidate = Pattern {
                pattern_id: id.clone(),
                pattern_type: seed.content.pattern_type(),
                content: seed.content.clone(),
                frequency,
                baseline: seed.frequency,
                confidence,
                contexts: contexts.into_iter().take(MAX_CONTEXTS).collect(),
                examples,
                version: next,
                created_at: existing.as_ref().map_or(now, |p| p.created_at),
                last_seen: now,
            };
            if existing
                .as_ref()
                .is_some_and(|p| same_derived_fields(p, &candidate))
            {
                continue;
            }
            patterns::upsert_pattern(tx, &candidate.to_row()?)?;
            recorder.upsert(candidate, existing.is_none())?;
        }

        let mut delta = LearningDelta {
            id: uuid::Uuid::new_v4().to_string(),
            trigger: canon_core::types::Trigger::Manual,
            mode: LearningMode::Incremental,
            revision: None,
            files_touched: 0,
            concepts_added: 0,
            concepts_modified: 0,
            concepts_removed: 0,
            patterns_added: recorder.added,
            patterns_modified: recorder.modified,
            patterns_removed: 0,
            duration_ms: 0,
            applied_at: now,
            preceding_version: preceding,
            resulting_version: preceding,
            partial_degradation: false,
            degraded_files: Vec::new(),
        };
        if recorder.is_empty() {
            delta.mode = LearningMode::Skip;
            delta.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(MergeOutcome {
                delta,
                discovered: Vec::new(),
                removed: Vec::new(),
            });
        }

        store_meta::advance_version(tx, preceding as i64, next as i64)?;
        delta.resulting_version = next;
        delta.duration_ms = started.elapsed().as_millis() as u64;
        deltas::insert_delta(tx, &delta.to_row()?)?;
        recorder.flush(tx)?;
        Ok(MergeOutcome {
            delta,
            discovered: recorder.discovered,
            removed: recorder.removed,
        })
    }

    // ---- Outcomes ----

    fn noop_delta(
        &self,
        origin: &OriginContext,
        version: u64,
        mode: LearningMode,
        started: Instant,
    ) -> LearningDelta {
        LearningDelta {
            id: uuid::Uuid::new_v4().to_string(),
            trigger: origin.trigger,
            mode,
            revision: origin.revision.clone(),
            files_touched: 0,
            concepts_added: 0,
            concepts_modified: 0,
            concepts_removed: 0,
            patterns_added: 0,
            patterns_modified: 0,
            patterns_removed: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            applied_at: chrono::Utc::now().timestamp(),
            preceding_version: version,
            resulting_version: version,
            partial_degradation: false,
            degraded_files: Vec::new(),
        }
    }

    fn discard(&self, preceding_version: u64, source: StorageError) -> LearnError {
        let error = LearnError::MergeFailed {
            preceding_version,
            source,
        };
        tracing::warn!(
            project_id = %self.project_id,
            preceding_version,
            error = %error,
            "delta discarded"
        );
        self.dispatcher.emit_delta_discarded(&DeltaDiscardedEvent {
            project_id: self.project_id.clone(),
            preceding_version,
            error_code: error.error_code().to_string(),
            message: error.to_string(),
        });
        error
    }

    fn emit_applied(&self, outcome: &MergeOutcome) {
        let delta = &outcome.delta;
        if delta.is_noop() {
            return;
        }
        for pattern in &outcome.discovered {
            self.dispatcher.emit_pattern_discovered(&PatternDiscoveredEvent {
                project_id: self.project_id.clone(),
                pattern_id: pattern.pattern_id.clone(),
                pattern_type: pattern.pattern_type.name().to_string(),
                confidence: pattern.confidence,
            });
        }
        for pattern_id in &outcome.removed {
            self.dispatcher.emit_pattern_removed(&PatternRemovedEvent {
                project_id: self.project_id.clone(),
                pattern_id: pattern_id.clone(),
                version: delta.resulting_version,
            });
        }
        self.dispatcher.emit_delta_applied(&DeltaAppliedEvent {
            project_id: self.project_id.clone(),
            delta_id: delta.id.clone(),
            trigger: delta.trigger.name().to_string(),
            preceding_version: delta.preceding_version,
            resulting_version: delta.resulting_version,
            patterns_added: delta.patterns_added,
            patterns_modified: delta.patterns_modified,
            patterns_removed: delta.patterns_removed,
            partial_degradation: delta.partial_degradation,
            duration_ms: delta.duration_ms,
        });
    }
}

/// Pattern mutations of one merge, flushed to the operation log in order.
struct OperationRecorder {
    version: u64,
    operations: Vec<DeltaOperationRow>,
    added: u32,
    modified: u32,
    discovered: Vec<Pattern>,
    removed: Vec<String>,
}

impl OperationRecorder {
    fn new(version: u64) -> Self {
        Self {
            version,
            operations: Vec::new(),
            added: 0,
            modified: 0,
            discovered: Vec::new(),
            removed: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn upsert(&mut self, pattern: Pattern, is_new: bool) -> Result<(), StorageError> {
        self.push(OP_UPSERT, &pattern.pattern_id, Some(to_json("pattern", &pattern)?));
        if is_new {
            self.added += 1;
            self.discovered.push(pattern);
        } else {
            self.modified += 1;
        }
        Ok(())
    }

    fn remove(&mut self, pattern_id: String) {
        self.push(OP_REMOVE, &pattern_id, None);
        self.removed.push(pattern_id);
    }

    fn push(&mut self, op: &str, pattern_id: &str, payload: Option<String>) {
        self.operations.push(DeltaOperationRow {
            resulting_version: self.version as i64,
            seq: self.operations.len() as i64,
            op: op.to_string(),
            pattern_id: pattern_id.to_string(),
            payload,
        });
    }

    fn flush(&self, tx: &Connection) -> Result<(), StorageError> {
        for row in &self.operations {
            deltas::insert_operation(tx, row)?;
        }
        Ok(())
    }
}

fn checked_path(raw: &str) -> Result<String, LearnError> {
    let path = normalize_path(raw);
    match relative_path_problem(&path) {
        Some(problem) => Err(LearnError::InvalidBatch {
            reason: format!("{problem}: '{raw}'"),
        }),
        None => Ok(path),
    }
}

/// Delete a file's concepts and evidence, marking the patterns it corroborated.
fn clear_file(
    tx: &Connection,
    path: &str,
    touched: &mut BTreeSet<String>,
) -> Result<(), StorageError> {
    for row in evidence::evidence_for_file(tx, path)? {
        touched.insert(row.pattern_id);
    }
    concepts::delete_file_concepts(tx, path)?;
    evidence::delete_file_evidence(tx, path)?;
    Ok(())
}

fn remove_pattern(tx: &Connection, pattern: &Pattern, version: u64, now: i64) -> Result<(), StorageError> {
    patterns::delete_pattern(tx, &pattern.pattern_id)?;
    tombstones::insert_tombstone(
        tx,
        &TombstoneRow {
            pattern_id: pattern.pattern_id.clone(),
            version: version as i64,
            pattern_type: pattern.pattern_type.name().to_string(),
            content: to_json("pattern content", &pattern.content)?,
            removed_at: now,
        },
    )
}

fn concept_row(path: &str, concept: &Concept) -> ConceptRow {
    ConceptRow {
        file_path: path.to_string(),
        name: concept.name.clone(),
        kind: concept.kind.name().to_string(),
        confidence: concept.confidence,
        line_start: i64::from(concept.location.line_start),
        line_end: i64::from(concept.location.line_end),
    }
}

/// Compare a file's stored concepts with freshly extracted ones, matched by
/// `(name, kind)`. A matched concept whose location moved counts as modified.
fn diff_concepts(old: &[ConceptRow], new: &[Concept], counts: &mut ConceptCounts) {
    let mut before: FxHashMap<(&str, &str), SmallVec4<(i64, i64)>> = FxHashMap::default();
    for row in old {
        before
            .entry((row.name.as_str(), row.kind.as_str()))
            .or_default()
            .push((row.line_start, row.line_end));
    }
    let mut after: FxHashMap<(&str, &str), SmallVec4<(i64, i64)>> = FxHashMap::default();
    for concept in new {
        after
            .entry((concept.name.as_str(), concept.kind.name()))
            .or_default()
            .push((
                i64::from(concept.location.line_start),
                i64::from(concept.location.line_end),
            ));
    }

    for (key, mut new_locations) in after {
        let mut old_locations = before.remove(&key).unwrap_or_default();
        old_locations.sort_unstable();
        new_locations.sort_unstable();
        let matched = old_locations.len().min(new_locations.len());
        counts.added += (new_locations.len() - matched) as u32;
        counts.removed += (old_locations.len() - matched) as u32;
        counts.modified += old_locations
            .iter()
            .zip(new_locations.iter())
            .filter(|(a, b)| a != b)
            .count() as u32;
    }
    counts.removed += before.values().map(|v| v.len() as u32).sum::<u32>();
}

/// Sorted, bounded contexts: parent directories and `lang:` tags of the
/// files holding evidence, plus any contexts carried from an import.
fn build_contexts(files: Vec<(String, Option<String>)>, carried: &[String]) -> Vec<String> {
    let mut contexts: BTreeSet<String> = carried.iter().cloned().collect();
    for (path, language) in files {
        if let Some(dir) = parent_dir(&path) {
            contexts.insert(dir.to_string());
        }
        if let Some(language) = language {
            contexts.insert(format!("lang:{language}"));
        }
    }
    contexts.into_iter().take(MAX_CONTEXTS).collect()
}

fn same_derived_fields(a: &Pattern, b: &Pattern) -> bool {
    a.frequency == b.frequency
        && a.baseline == b.baseline
        && a.confidence == b.confidence
        && a.contexts == b.contexts
        && a.examples == b.examples
        && a.last_seen == b.last_seen
}

/// Batch changes keyed by path, in first-occurrence order.
struct CoalescedChanges {
    slots: Vec<Option<FileChange>>,
    positions: FxHashMap<String, usize>,
}

impl CoalescedChanges {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            positions: FxHashMap::default(),
        }
    }

    fn pending(&self, path: &str) -> Option<&FileChange> {
        self.positions
            .get(path)
            .and_then(|&idx| self.slots[idx].as_ref())
    }

    /// Source path of a rename still pending onto `path`.
    fn pending_rename_source(&self, path: &str) -> Option<String> {
        self.pending(path)
            .filter(|c| c.kind == ChangeKind::Renamed)
            .and_then(|c| c.previous_path.clone())
    }

    fn has_pending_edit(&self, path: &str) -> bool {
        self.pending(path).is_some_and(|c| c.kind.needs_extraction())
    }

    fn place(&mut self, change: FileChange) {
        match self.positions.get(&change.path) {
            Some(&idx) => self.slots[idx] = Some(change),
            None => {
                self.positions.insert(change.path.clone(), self.slots.len());
                self.slots.push(Some(change));
            }
        }
    }

    fn into_changes(self) -> Vec<FileChange> {
        self.slots.into_iter().flatten().collect()
    }
}

fn degraded_paths(ops: &[FileOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            FileOp::Extract {
                path,
                outcome: Extracted::Failed(_),
                ..
            } => Some(path.clone()),
            FileOp::Extract {
                path,
                outcome: Extracted::Analyzed(file),
                ..
            } if file.degraded => Some(path.clone()),
            _ => None,
        })
        .collect()
}

fn last_revision(ops: &[FileOp]) -> Option<String> {
    ops.iter().rev().find_map(|op| match op {
        FileOp::Extract { revision, .. } | FileOp::Rename { revision, .. } => revision.clone(),
        FileOp::Delete { .. } => None,
    })
}
