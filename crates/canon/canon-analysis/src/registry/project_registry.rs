//! Project registry in the global database.
//!
//! Linking is idempotent by canonical path. Unlinking is a soft delete: the
//! row and its occurrences stay, the project stops counting toward consensus.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use canon_core::config::CanonConfig;
use canon_core::errors::{RegistryError, StorageError};
use canon_core::events::types::{ProjectLinkedEvent, ProjectUnlinkedEvent};
use canon_core::events::EventDispatcher;
use canon_storage::connection::writer::with_immediate_transaction;
use canon_storage::queries::projects::{self, ProjectRow};
use canon_storage::GlobalStore;

use super::types::{LinkOutcome, Project, ProjectMetadata};
use crate::aggregation::recompute_all_consensus;
use crate::patterns::types::to_json;

pub struct ProjectRegistry {
    global: Arc<GlobalStore>,
    cas_max_attempts: u32,
    dispatcher: Arc<EventDispatcher>,
}

impl ProjectRegistry {
    pub fn new(global: Arc<GlobalStore>, config: &CanonConfig, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            global,
            cas_max_attempts: config.aggregation.effective_cas_max_attempts(),
            dispatcher,
        }
    }

    /// Register the project rooted at `path`, or refresh and reactivate it if
    /// the path is already known.
    pub fn link_project(&self, path: &Path, metadata: &ProjectMetadata) -> Result<LinkOutcome, RegistryError> {
        let canonical = canonical_project_path(path)?;
        let path_str = canonical.to_string_lossy().to_string();
        let name = metadata
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_name(&canonical));
        let frameworks = to_json("project frameworks", &metadata.frameworks)?;
        let now = chrono::Utc::now().timestamp();

        let (row, relinked) = self.global.db().with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let relinked = match projects::get_project_by_path(tx, &path_str)? {
                    Some(existing) => {
                        projects::relink_project(
                            tx,
                            &existing.id,
                            &name,
                            metadata.primary_language.as_deref(),
                            &frameworks,
                        )?;
                        Some(existing.id)
                    }
                    None => None,
                };
                let id = match &relinked {
                    Some(id) => id.clone(),
                    None => {
                        let id = uuid::Uuid::new_v4().to_string();
                        projects::insert_project(
                            tx,
                            &ProjectRow {
                                id: id.clone(),
                                path: path_str.clone(),
                                name: name.clone(),
                                primary_language: metadata.primary_language.clone(),
                                frameworks: frameworks.clone(),
                                linked_at: now,
                                unlinked_at: None,
                                last_synced_version: 0,
                                last_synced_at: None,
                                pattern_count: 0,
                                concept_count: 0,
                                is_active: true,
                            },
                        )?;
                        id
                    }
                };
                recompute_all_consensus(tx, self.cas_max_attempts, now)?;
                let row = projects::get_project(tx, &id)?.ok_or(StorageError::NotFound {
                    entity: "project".to_string(),
                    id: id.clone(),
                })?;
                Ok((row, relinked.is_some()))
            })
        })?;

        let project = Project::from_row(&row)?;
        tracing::info!(
            project_id = %project.id,
            path = %project.path,
            relinked,
            "project linked"
        );
        self.dispatcher.emit_project_linked(&ProjectLinkedEvent {
            project_id: project.id.clone(),
            path: project.path.clone(),
            relinked,
        });
        Ok(LinkOutcome { project, relinked })
    }

    /// Soft-delete a project. Unlinking an inactive project is a no-op.
    pub fn unlink_project(&self, project_id: &str) -> Result<(), RegistryError> {
        let now = chrono::Utc::now().timestamp();
        let was_active = self.global.db().with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                match projects::get_project(tx, project_id)? {
                    None => Ok(None),
                    Some(row) if !row.is_active => Ok(Some(false)),
                    Some(_) => {
                        projects::deactivate_project(tx, project_id, now)?;
                        recompute_all_consensus(tx, self.cas_max_attempts, now)?;
                        Ok(Some(true))
                    }
                }
            })
        })?;
        match was_active {
            None => {
                return Err(RegistryError::UnknownProject {
                    project_id: project_id.to_string(),
                })
            }
            Some(false) => {
                tracing::debug!(project_id, "project already unlinked");
                return Ok(());
            }
            Some(true) => {}
        }
        tracing::info!(project_id, "project unlinked");
        self.dispatcher.emit_project_unlinked(&ProjectUnlinkedEvent {
            project_id: project_id.to_string(),
        });
        Ok(())
    }

    pub fn update_project_stats(
        &self,
        project_id: &str,
        pattern_count: u64,
        concept_count: u64,
    ) -> Result<(), RegistryError> {
        let updated = self.global.db().with_writer(|conn| {
            if projects::get_project(conn, project_id)?.is_none() {
                return Ok(false);
            }
            projects::update_project_stats(
                conn,
                project_id,
                pattern_count.min(i64::MAX as u64) as i64,
                concept_count.min(i64::MAX as u64) as i64,
            )?;
            Ok(true)
        })?;
        if updated {
            Ok(())
        } else {
            Err(RegistryError::UnknownProject {
                project_id: project_id.to_string(),
            })
        }
    }

    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>, RegistryError> {
        let row = self
            .global
            .db()
            .with_reader(|conn| projects::get_project(conn, project_id))?;
        Ok(row.as_ref().map(Project::from_row).transpose()?)
    }

    /// Look a project up by path, canonicalized the same way `link_project` does.
    pub fn find_by_path(&self, path: &Path) -> Result<Option<Project>, RegistryError> {
        let canonical = canonical_project_path(path)?;
        let path_str = canonical.to_string_lossy().to_string();
        let row = self
            .global
            .db()
            .with_reader(|conn| projects::get_project_by_path(conn, &path_str))?;
        Ok(row.as_ref().map(Project::from_row).transpose()?)
    }

    pub fn list_projects(&self, active_only: bool) -> Result<Vec<Project>, RegistryError> {
        let rows = self
            .global
            .db()
            .with_reader(|conn| projects::list_projects(conn, active_only))?;
        rows.iter()
            .map(Project::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RegistryError::from)
    }
}

fn canonical_project_path(path: &Path) -> Result<PathBuf, RegistryError> {
    if path.as_os_str().is_empty() {
        return Err(RegistryError::InvalidPath {
            path: String::new(),
            reason: "path is empty".to_string(),
        });
    }
    let canonical = std::fs::canonicalize(path).map_err(|e| RegistryError::InvalidPath {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if !canonical.is_dir() {
        return Err(RegistryError::InvalidPath {
            path: path.display().to_string(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
