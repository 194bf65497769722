//! Project registry tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use canon_analysis::registry::{ProjectMetadata, ProjectRegistry};
use canon_core::config::CanonConfig;
use canon_core::errors::{CanonErrorCode, RegistryError};
use canon_core::events::types::{ProjectLinkedEvent, ProjectUnlinkedEvent};
use canon_core::events::{CanonEventHandler, EventDispatcher};
use canon_storage::GlobalStore;
use tempfile::TempDir;

#[derive(Default)]
struct LinkEvents {
    linked: AtomicUsize,
    relinked: AtomicUsize,
    unlinked: AtomicUsize,
}

impl CanonEventHandler for LinkEvents {
    fn on_project_linked(&self, event: &ProjectLinkedEvent) {
        self.linked.fetch_add(1, Ordering::Relaxed);
        if event.relinked {
            self.relinked.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_project_unlinked(&self, _event: &ProjectUnlinkedEvent) {
        self.unlinked.fetch_add(1, Ordering::Relaxed);
    }
}

fn registry() -> (ProjectRegistry, Arc<LinkEvents>) {
    let events = Arc::new(LinkEvents::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(events.clone());
    let registry = ProjectRegistry::new(
        Arc::new(GlobalStore::open_in_memory().unwrap()),
        &CanonConfig::default(),
        Arc::new(dispatcher),
    );
    (registry, events)
}

#[test]
fn link_defaults_name_to_directory() {
    let (registry, events) = registry();
    let parent = TempDir::new().unwrap();
    let dir = parent.path().join("billing-service");
    std::fs::create_dir(&dir).unwrap();

    let outcome = registry
        .link_project(
            &dir,
            &ProjectMetadata {
                primary_language: Some("typescript".to_string()),
                frameworks: vec!["express".to_string()],
                ..ProjectMetadata::default()
            },
        )
        .unwrap();
    assert!(!outcome.relinked);
    let project = outcome.project;
    assert_eq!(project.name, "billing-service");
    assert_eq!(project.primary_language.as_deref(), Some("typescript"));
    assert_eq!(project.frameworks, vec!["express".to_string()]);
    assert!(project.is_active);
    assert_eq!(project.last_synced_version, 0);
    assert_eq!(events.linked.load(Ordering::Relaxed), 1);
}

#[test]
fn linking_the_same_path_is_idempotent() {
    let (registry, events) = registry();
    let dir = TempDir::new().unwrap();

    let first = registry.link_project(dir.path(), &ProjectMetadata::default()).unwrap();
    let second = registry
        .link_project(
            &dir.path().join("."),
            &ProjectMetadata {
                name: Some("renamed".to_string()),
                ..ProjectMetadata::default()
            },
        )
        .unwrap();

    assert!(second.relinked);
    assert_eq!(first.project.id, second.project.id);
    assert_eq!(second.project.name, "renamed");
    assert_eq!(registry.list_projects(false).unwrap().len(), 1);
    assert_eq!(events.relinked.load(Ordering::Relaxed), 1);
}

#[test]
fn unlink_is_a_soft_delete_and_relink_reactivates() {
    let (registry, events) = registry();
    let dir = TempDir::new().unwrap();
    let id = registry
        .link_project(dir.path(), &ProjectMetadata::default())
        .unwrap()
        .project
        .id;

    registry.unlink_project(&id).unwrap();
    let project = registry.get_project(&id).unwrap().unwrap();
    assert!(!project.is_active);
    assert!(project.unlinked_at.is_some());
    assert!(registry.list_projects(true).unwrap().is_empty());
    assert_eq!(registry.list_projects(false).unwrap().len(), 1);
    assert_eq!(events.unlinked.load(Ordering::Relaxed), 1);

    let relinked = registry.link_project(dir.path(), &ProjectMetadata::default()).unwrap();
    assert!(relinked.relinked);
    assert_eq!(relinked.project.id, id);
    assert!(relinked.project.is_active);
    assert!(relinked.project.unlinked_at.is_none());
}

#[test]
fn unknown_projects_cannot_be_unlinked() {
    let (registry, _) = registry();
    let err = registry.unlink_project("missing").unwrap_err();
    assert!(matches!(err, RegistryError::UnknownProject { .. }));
    assert_eq!(err.error_code(), "UNKNOWN_PROJECT");

    let dir = TempDir::new().unwrap();
    let id = registry
        .link_project(dir.path(), &ProjectMetadata::default())
        .unwrap()
        .project
        .id;
    registry.unlink_project(&id).unwrap();
    let unlinked_at = registry.get_project(&id).unwrap().unwrap().unlinked_at;
    registry.unlink_project(&id).unwrap();
    assert_eq!(registry.get_project(&id).unwrap().unwrap().unlinked_at, unlinked_at);
}

#[test]
fn repeated_unlink_emits_one_event() {
    let (registry, events) = registry();
    let dir = TempDir::new().unwrap();
    let id = registry
        .link_project(dir.path(), &ProjectMetadata::default())
        .unwrap()
        .project
        .id;
    registry.unlink_project(&id).unwrap();
    registry.unlink_project(&id).unwrap();
    assert_eq!(events.unlinked.load(Ordering::Relaxed), 1);
    assert!(!registry.get_project(&id).unwrap().unwrap().is_active);
}

#[test]
fn invalid_paths_are_rejected() {
    let (registry, _) = registry();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("file.txt");
    std::fs::write(&file, "x").unwrap();

    for path in [file, dir.path().join("missing"), std::path::PathBuf::new()] {
        let err = registry
            .link_project(&path, &ProjectMetadata::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPath { .. }), "{path:?}");
    }
    assert!(registry.list_projects(false).unwrap().is_empty());
}

#[test]
fn stats_and_lookup_by_path() {
    let (registry, _) = registry();
    let dir = TempDir::new().unwrap();
    let id = registry
        .link_project(dir.path(), &ProjectMetadata::default())
        .unwrap()
        .project
        .id;

    registry.update_project_stats(&id, 12, 40).unwrap();
    let found = registry.find_by_path(dir.path()).unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.pattern_count, 12);
    assert_eq!(found.concept_count, 40);

    assert!(matches!(
        registry.update_project_stats("missing", 1, 1),
        Err(RegistryError::UnknownProject { .. })
    ));
}
