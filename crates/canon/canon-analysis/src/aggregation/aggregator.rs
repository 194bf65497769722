//! Global aggregator: merges per-project patterns into signature-keyed
//! aggregations in the global database.
//!
//! Sync reads a project's store in one snapshot, then applies the changes
//! grouped by store version, one global transaction per version. The
//! project's checkpoint advances inside each of those transactions, so an
//! interrupted sync leaves it at the last fully merged version.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use canon_core::config::CanonConfig;
use canon_core::errors::{CanonError, CanonErrorCode, StorageError, SyncError};
use canon_core::events::types::{ErrorEvent, SyncCompleteEvent};
use canon_core::events::EventDispatcher;
use canon_storage::connection::writer::{with_immediate_transaction, with_read_snapshot};
use canon_storage::queries::aggregations::{self, AggregationQuery, OccurrenceRow};
use canon_storage::queries::projects::{self, ProjectRow};
use canon_storage::queries::{concepts, patterns, store_meta, tombstones};
use canon_storage::{GlobalStore, PatternStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rusqlite::Connection;

use super::consensus::{refresh_aggregation, Refresh, SignatureMeta};
use super::ranking::{RankedAggregation, SemanticRanker};
use super::signature::signature;
use super::types::{
    AggregationFilter, LanguageShare, PatternAggregation, PortfolioView, SyncResult, SyncStatus,
};
use crate::patterns::types::to_json;
use crate::patterns::Pattern;

/// Owns the global aggregations; only reads per-project stores.
pub struct GlobalAggregator {
    global: Arc<GlobalStore>,
    stores: DashMap<String, Arc<PatternStore>>,
    in_progress: DashMap<String, ()>,
    cas_max_attempts: u32,
    top_languages: usize,
    default_limit: usize,
    read_pool_size: usize,
    ranker: Option<SemanticRanker>,
    dispatcher: Arc<EventDispatcher>,
}

/// Marks a project as being synced until dropped.
pub struct SyncGuard<'a> {
    in_progress: &'a DashMap<String, ()>,
    project_id: String,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.in_progress.remove(&self.project_id);
    }
}

/// One project store change, as seen by sync.
enum StoreChange {
    Retract { pattern_id: String },
    Upsert(Pattern),
}

struct StoreSnapshot {
    version: u64,
    changes: BTreeMap<u64, Vec<StoreChange>>,
    pattern_count: i64,
    concept_count: i64,
}

#[derive(Default)]
struct MergeCounts {
    added: u32,
    updated: u32,
    removed: u32,
    cas_retries: u32,
}

impl GlobalAggregator {
    pub fn new(global: Arc<GlobalStore>, config: &CanonConfig, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            global,
            stores: DashMap::new(),
            in_progress: DashMap::new(),
            cas_max_attempts: config.aggregation.effective_cas_max_attempts(),
            top_languages: config.aggregation.effective_top_languages(),
            default_limit: config.aggregation.effective_default_limit(),
            read_pool_size: config.storage.effective_read_pool_size(),
            ranker: None,
            dispatcher,
        }
    }

    /// Enable semantic ranking of aggregations.
    pub fn with_ranker(mut self, ranker: SemanticRanker) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn global(&self) -> &Arc<GlobalStore> {
        &self.global
    }

    pub fn cas_max_attempts(&self) -> u32 {
        self.cas_max_attempts
    }

    /// Use an already open store for a project instead of opening one from
    /// the project's path.
    pub fn attach_store(&self, project_id: &str, store: Arc<PatternStore>) {
        self.stores.insert(project_id.to_string(), store);
    }

    pub fn detach_store(&self, project_id: &str) -> Option<Arc<PatternStore>> {
        self.stores.remove(project_id).map(|(_, store)| store)
    }

    /// Claim the sync slot of a project. Fails fast if a sync is running.
    pub fn try_begin_sync(&self, project_id: &str) -> Result<SyncGuard<'_>, SyncError> {
        match self.in_progress.entry(project_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(SyncError::InProgress {
                    project_id: project_id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }
        Ok(SyncGuard {
            in_progress: &self.in_progress,
            project_id: project_id.to_string(),
        })
    }

    /// Merge everything a project learned since its checkpoint.
    pub fn sync_project(&self, project_id: &str) -> Result<SyncResult, SyncError> {
        let started = Instant::now();
        let _guard = self.try_begin_sync(project_id)?;
        let _span = tracing::info_span!("sync_project", project_id).entered();

        let project = self
            .global
            .db()
            .with_reader(|conn| projects::get_project(conn, project_id))?
            .ok_or_else(|| SyncError::UnknownProject {
                project_id: project_id.to_string(),
            })?;
        if !project.is_active {
            return Err(SyncError::Inactive {
                project_id: project_id.to_string(),
            });
        }

        let store = self.store_for(&project)?;
        let checkpoint = project.last_synced_version.max(0) as u64;
        let snapshot = read_snapshot(&store, checkpoint)?;
        if snapshot.version < checkpoint {
            let err = SyncError::StoreBehindCheckpoint {
                project_id: project_id.to_string(),
                store_version: snapshot.version,
                checkpoint,
            };
            tracing::warn!(
                store_version = snapshot.version,
                checkpoint,
                "store is behind its sync checkpoint, rebase required"
            );
            self.dispatcher.emit_error(&ErrorEvent {
                message: err.to_string(),
                error_code: err.error_code().to_string(),
            });
            return Err(err);
        }

        let mut merged_through = checkpoint;
        let mut totals = MergeCounts::default();
        for (version, changes) in &snapshot.changes {
            let result = self.global.db().with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let counts = self.apply_changes(tx, project_id, changes)?;
                    projects::advance_checkpoint(tx, project_id, *version as i64, now())?;
                    Ok(counts)
                })
            });
            match result {
                Ok(counts) => {
                    totals.added += counts.added;
                    totals.updated += counts.updated;
                    totals.removed += counts.removed;
                    totals.cas_retries += counts.cas_retries;
                    merged_through = *version;
                }
                Err(source) => {
                    tracing::warn!(
                        project_id,
                        checkpoint = merged_through,
                        failed_version = version,
                        error = %source,
                        "sync interrupted"
                    );
                    self.dispatcher.emit_error(&ErrorEvent {
                        message: format!("sync of {project_id} interrupted: {source}"),
                        error_code: source.error_code().to_string(),
                    });
                    return Err(SyncError::Interrupted {
                        project_id: project_id.to_string(),
                        checkpoint: merged_through,
                        source,
                    });
                }
            }
        }

        let final_checkpoint = snapshot.version.max(merged_through);
        self.global.db().with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                projects::advance_checkpoint(tx, project_id, final_checkpoint as i64, now())?;
                projects::update_project_stats(
                    tx,
                    project_id,
                    snapshot.pattern_count,
                    snapshot.concept_count,
                )
            })
        })?;

        let status = if snapshot.changes.is_empty() && snapshot.version <= checkpoint {
            SyncStatus::UpToDate
        } else {
            SyncStatus::Complete
        };
        let result = SyncResult {
            project_id: project_id.to_string(),
            patterns_added: totals.added,
            patterns_updated: totals.updated,
            patterns_removed: totals.removed,
            concepts_added: (snapshot.concept_count - project.concept_count).max(0) as u64,
            status,
            checkpoint: final_checkpoint.max(checkpoint),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            patterns_added = result.patterns_added,
            patterns_updated = result.patterns_updated,
            patterns_removed = result.patterns_removed,
            checkpoint = result.checkpoint,
            cas_retries = totals.cas_retries,
            sync_duration = result.duration_ms,
            "sync complete"
        );
        self.dispatcher.emit_sync_complete(&SyncCompleteEvent {
            project_id: project_id.to_string(),
            patterns_added: result.patterns_added,
            patterns_updated: result.patterns_updated,
            patterns_removed: result.patterns_removed,
            checkpoint: result.checkpoint,
            duration_ms: result.duration_ms,
        });
        Ok(result)
    }

    /// Retract everything a project contributed and move its checkpoint back
    /// to zero, so the next sync merges the store from scratch. Returns the
    /// number of aggregations touched.
    pub fn rebase_project(&self, project_id: &str) -> Result<usize, SyncError> {
        let _guard = self.try_begin_sync(project_id)?;
        let exists = self
            .global
            .db()
            .with_reader(|conn| projects::get_project(conn, project_id))?
            .is_some();
        if !exists {
            return Err(SyncError::UnknownProject {
                project_id: project_id.to_string(),
            });
        }

        let touched = self.global.db().with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let now = now();
                let signatures = aggregations::delete_project_occurrences(tx, project_id)?;
                for sig in &signatures {
                    refresh_aggregation(tx, sig, None, self.cas_max_attempts, now)?;
                }
                projects::reset_checkpoint(tx, project_id, now)?;
                Ok(signatures.len())
            })
        })?;
        tracing::info!(project_id, aggregations = touched, "project rebased");
        Ok(touched)
    }

    /// Aggregations matching `filter`, ordered by project count desc, then
    /// aggregated confidence desc.
    pub fn get_aggregations(&self, filter: &AggregationFilter) -> Result<Vec<PatternAggregation>, StorageError> {
        let query = AggregationQuery {
            category: filter.category.clone(),
            min_project_count: filter.min_project_count.map(|n| n.min(i64::MAX as u64) as i64),
            min_consensus: filter.min_consensus,
            language: filter.language.clone(),
            limit: filter.limit.unwrap_or(self.default_limit).min(i64::MAX as usize) as i64,
        };
        self.global.db().with_reader(|conn| {
            with_read_snapshot(conn, |tx| {
                let rows = aggregations::query_aggregations(tx, &query)?;
                rows.iter()
                    .map(|row| {
                        let occurrences: Vec<OccurrenceRow> =
                            aggregations::occurrences_for(tx, &row.signature)?;
                        PatternAggregation::from_rows(row, &occurrences)
                    })
                    .collect()
            })
        })
    }

    /// Aggregations matching `filter`, re-ordered by similarity to `query`.
    /// Without a configured ranker the filter order is kept with score 0.
    pub fn get_ranked_aggregations(
        &self,
        filter: &AggregationFilter,
        query: &str,
    ) -> Result<Vec<RankedAggregation>, CanonError> {
        let found = self.get_aggregations(filter)?;
        match &self.ranker {
            Some(ranker) => Ok(ranker.rank(query, found)?),
            None => Ok(found
                .into_iter()
                .map(|aggregation| RankedAggregation {
                    aggregation,
                    score: 0.0,
                })
                .collect()),
        }
    }

    pub fn get_portfolio_view(&self) -> Result<PortfolioView, StorageError> {
        self.global.db().with_reader(|conn| {
            with_read_snapshot(conn, |tx| {
                let (total_projects, total_patterns, total_concepts) = projects::portfolio_totals(tx)?;
                let total_aggregations = aggregations::count_aggregations(tx)?;
                let top_languages = projects::top_languages(tx, self.top_languages)?
                    .into_iter()
                    .map(|(language, count)| LanguageShare {
                        language,
                        projects: count.max(0) as u64,
                    })
                    .collect();
                Ok(PortfolioView {
                    total_projects: total_projects.max(0) as u64,
                    total_patterns: total_patterns.max(0) as u64,
                    total_concepts: total_concepts.max(0) as u64,
                    total_aggregations: total_aggregations.max(0) as u64,
                    top_languages,
                })
            })
        })
    }

    fn store_for(&self, project: &ProjectRow) -> Result<Arc<PatternStore>, StorageError> {
        if let Some(store) = self.stores.get(&project.id) {
            return Ok(Arc::clone(store.value()));
        }
        let store = Arc::new(PatternStore::open_for_project(
            Path::new(&project.path),
            self.read_pool_size,
        )?);
        self.stores.insert(project.id.clone(), Arc::clone(&store));
        Ok(store)
    }

    fn apply_changes(
        &self,
        tx: &Connection,
        project_id: &str,
        changes: &[StoreChange],
    ) -> Result<MergeCounts, StorageError> {
        let mut counts = MergeCounts::default();
        let now = now();

        for change in changes {
            match change {
                StoreChange::Retract { pattern_id } => {
                    let touched = aggregations::delete_pattern_occurrences(tx, project_id, pattern_id)?;
                    if !touched.is_empty() {
                        counts.removed += 1;
                    }
                    for sig in touched {
                        let (_, retries) =
                            refresh_aggregation(tx, &sig, None, self.cas_max_attempts, now)?;
                        counts.cas_retries += retries;
                    }
                }
                StoreChange::Upsert(pattern) => {
                    let sig = signature(&pattern.content);
                    let occurrence = OccurrenceRow {
                        signature: sig.clone(),
                        project_id: project_id.to_string(),
                        pattern_id: pattern.pattern_id.clone(),
                        frequency: pattern.frequency.min(i64::MAX as u64) as i64,
                        confidence: pattern.confidence,
                        languages: to_json("occurrence languages", &pattern.languages())?,
                        updated_at: now,
                    };
                    if aggregations::upsert_occurrence(tx, &occurrence)? {
                        counts.updated += 1;
                    } else {
                        counts.added += 1;
                    }
                    let description = pattern.content.describe();
                    let meta = SignatureMeta {
                        category: pattern.pattern_type.name(),
                        description: &description,
                    };
                    let (refresh, retries) =
                        refresh_aggregation(tx, &sig, Some(meta), self.cas_max_attempts, now)?;
                    counts.cas_retries += retries;
                    if refresh == Refresh::Inserted {
                        tracing::debug!(signature = %sig, "new aggregation");
                    }
                }
            }
        }
        Ok(counts)
    }
}

fn read_snapshot(store: &PatternStore, checkpoint: u64) -> Result<StoreSnapshot, StorageError> {
    store.db().with_reader(|conn| {
        with_read_snapshot(conn, |tx| {
            let version = store_meta::current_version(tx)?.max(0) as u64;
            let mut changes: BTreeMap<u64, Vec<StoreChange>> = BTreeMap::new();

            // Retractions first within a version.
            for tombstone in tombstones::tombstones_since(tx, checkpoint as i64)? {
                changes
                    .entry(tombstone.version.max(0) as u64)
                    .or_default()
                    .push(StoreChange::Retract {
                        pattern_id: tombstone.pattern_id,
                    });
            }
            for row in patterns::patterns_since(tx, checkpoint as i64)? {
                let pattern = Pattern::from_row(&row)?;
                changes
                    .entry(pattern.version)
                    .or_default()
                    .push(StoreChange::Upsert(pattern));
            }

            Ok(StoreSnapshot {
                version,
                changes,
                pattern_count: patterns::count_patterns(tx)?,
                concept_count: concepts::count_concepts(tx)?,
            })
        })
    })
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
