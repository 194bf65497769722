//! Global aggregation tests: sync, consensus, retraction, checkpoints.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use canon_analysis::aggregation::{
    signature, AggregationFilter, GlobalAggregator, SemanticRanker, SyncStatus,
};
use canon_analysis::extraction::{FsSourceReader, LexicalExtractor};
use canon_analysis::learning::{ChangeBatch, IncrementalLearner, OriginContext, PatternSeed};
use canon_analysis::patterns::{CaseStyle, PatternContent, QuoteStyle, StyleRule};
use canon_analysis::registry::{ProjectMetadata, ProjectRegistry};
use canon_core::config::CanonConfig;
use canon_core::errors::{CanonErrorCode, ExtractionError, SyncError};
use canon_core::events::types::{ErrorEvent, SyncCompleteEvent};
use canon_core::events::{CanonEventHandler, EventDispatcher};
use canon_core::traits::Embedder;
use canon_core::types::{ConceptKind, FileChange};
use canon_storage::queries::sqlite_err;
use canon_storage::{GlobalStore, PatternStore};
use tempfile::TempDir;

#[derive(Default)]
struct SyncEvents {
    completed: AtomicUsize,
    errors: AtomicUsize,
}

impl CanonEventHandler for SyncEvents {
    fn on_sync_complete(&self, _event: &SyncCompleteEvent) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_error(&self, _event: &ErrorEvent) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

struct TestProject {
    id: String,
    dir: TempDir,
    learner: IncrementalLearner,
}

struct World {
    config: CanonConfig,
    dispatcher: Arc<EventDispatcher>,
    events: Arc<SyncEvents>,
    aggregator: GlobalAggregator,
    registry: ProjectRegistry,
}

impl World {
    fn new() -> Self {
        let config = CanonConfig::default();
        let events = Arc::new(SyncEvents::default());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(events.clone());
        let dispatcher = Arc::new(dispatcher);
        let global = Arc::new(GlobalStore::open_in_memory().unwrap());
        let aggregator = GlobalAggregator::new(Arc::clone(&global), &config, Arc::clone(&dispatcher));
        let registry = ProjectRegistry::new(global, &config, Arc::clone(&dispatcher));
        Self {
            config,
            dispatcher,
            events,
            aggregator,
            registry,
        }
    }

    fn project(&self, language: &str) -> TestProject {
        let dir = TempDir::new().unwrap();
        let metadata = ProjectMetadata {
            primary_language: Some(language.to_string()),
            ..ProjectMetadata::default()
        };
        let id = self.registry.link_project(dir.path(), &metadata).unwrap().project.id;
        let store = Arc::new(PatternStore::open_in_memory(dir.path()).unwrap());
        self.aggregator.attach_store(&id, Arc::clone(&store));
        let learner = IncrementalLearner::new(
            id.clone(),
            store,
            Arc::new(LexicalExtractor::new()),
            Arc::new(FsSourceReader::default()),
            &self.config,
            Arc::clone(&self.dispatcher),
        );
        TestProject { id, dir, learner }
    }
}

fn camel_variables() -> PatternContent {
    PatternContent::naming(ConceptKind::Variable, CaseStyle::Camel)
}

fn seed(content: PatternContent, frequency: u64, confidence: f64, contexts: &[&str]) -> PatternSeed {
    PatternSeed {
        content,
        frequency,
        confidence,
        contexts: contexts.iter().map(|c| c.to_string()).collect(),
    }
}

#[test]
fn aggregation_weights_confidence_by_frequency() {
    let world = World::new();
    let a = world.project("typescript");
    let b = world.project("typescript");
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    b.learner.import_patterns(&[seed(camel_variables(), 15, 0.9, &[])]).unwrap();

    let first = world.aggregator.sync_project(&a.id).unwrap();
    assert_eq!(first.status, SyncStatus::Complete);
    assert_eq!(first.patterns_added, 1);
    assert_eq!(first.checkpoint, 1);
    world.aggregator.sync_project(&b.id).unwrap();

    let found = world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap();
    assert_eq!(found.len(), 1);
    let agg = &found[0];
    assert_eq!(agg.signature, "naming:variable:camelCase");
    assert_eq!(agg.category, "naming");
    assert_eq!(agg.project_count, 2);
    assert_eq!(agg.occurrences.len(), 2);
    assert!((agg.aggregated_confidence - 0.825).abs() < 1e-9);
    assert!((agg.consensus_score - 1.0).abs() < 1e-9);
    assert_eq!(world.events.completed.load(Ordering::Relaxed), 2);
}

#[test]
fn consensus_counts_only_active_projects() {
    let world = World::new();
    let a = world.project("typescript");
    let b = world.project("typescript");
    let _c = world.project("python");
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    b.learner.import_patterns(&[seed(camel_variables(), 15, 0.9, &[])]).unwrap();
    world.aggregator.sync_project(&a.id).unwrap();
    world.aggregator.sync_project(&b.id).unwrap();

    let agg = &world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap()[0];
    assert!((agg.consensus_score - 2.0 / 3.0).abs() < 1e-9);

    world.registry.unlink_project(&b.id).unwrap();
    let agg = &world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap()[0];
    assert!((agg.consensus_score - 0.5).abs() < 1e-9);
    assert_eq!(agg.project_count, 2);
    assert!((agg.aggregated_confidence - 0.825).abs() < 1e-9);

    let err = world.aggregator.sync_project(&b.id).unwrap_err();
    assert!(matches!(err, SyncError::Inactive { .. }));
    assert_eq!(err.error_code(), "PROJECT_INACTIVE");
}

#[test]
fn second_sync_is_up_to_date() {
    let world = World::new();
    let a = world.project("typescript");
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    world.aggregator.sync_project(&a.id).unwrap();

    let again = world.aggregator.sync_project(&a.id).unwrap();
    assert_eq!(again.status, SyncStatus::UpToDate);
    assert_eq!(again.patterns_added, 0);
    assert_eq!(again.patterns_updated, 0);
    assert_eq!(again.checkpoint, 1);

    let agg = &world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap()[0];
    assert_eq!(agg.revision, 1);
}

#[test]
fn resync_updates_existing_occurrence() {
    let world = World::new();
    let a = world.project("typescript");
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    world.aggregator.sync_project(&a.id).unwrap();

    a.learner.import_patterns(&[seed(camel_variables(), 9, 0.8, &[])]).unwrap();
    let result = world.aggregator.sync_project(&a.id).unwrap();
    assert_eq!(result.patterns_added, 0);
    assert_eq!(result.patterns_updated, 1);
    assert_eq!(result.checkpoint, 2);

    let agg = &world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap()[0];
    assert_eq!(agg.occurrences.len(), 1);
    assert_eq!(agg.occurrences[0].frequency, 9);
    assert_eq!(agg.revision, 2);
}

#[test]
fn removed_patterns_are_retracted() {
    let world = World::new();
    let a = world.project("typescript");
    std::fs::create_dir_all(a.dir.path().join("src")).unwrap();
    std::fs::write(a.dir.path().join("src/a.ts"), "const userId = 1;\n").unwrap();
    a.learner
        .process_changes(
            &ChangeBatch::new(vec![FileChange::added("src/a.ts")]),
            &OriginContext::manual(),
        )
        .unwrap();
    world.aggregator.sync_project(&a.id).unwrap();
    let found = world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].languages, vec!["typescript".to_string()]);

    a.learner
        .process_changes(
            &ChangeBatch::new(vec![FileChange::deleted("src/a.ts")]),
            &OriginContext::manual(),
        )
        .unwrap();
    let result = world.aggregator.sync_project(&a.id).unwrap();
    assert_eq!(result.patterns_removed, 1);
    assert_eq!(result.checkpoint, 2);
    assert!(world
        .aggregator
        .get_aggregations(&AggregationFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn interrupted_sync_keeps_last_merged_checkpoint() {
    let world = World::new();
    let a = world.project("typescript");
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    a.learner
        .import_patterns(&[seed(
            PatternContent::naming(ConceptKind::Class, CaseStyle::Pascal),
            4,
            0.7,
            &[],
        )])
        .unwrap();

    let global = world.aggregator.global();
    global
        .db()
        .with_writer(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_classes BEFORE INSERT ON aggregation_occurrences \
                 WHEN NEW.signature = 'naming:class:PascalCase' \
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .map_err(sqlite_err)
        })
        .unwrap();

    let err = world.aggregator.sync_project(&a.id).unwrap_err();
    match &err {
        SyncError::Interrupted { checkpoint, .. } => assert_eq!(*checkpoint, 1),
        other => panic!("expected Interrupted, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(err.error_code(), "SYNC_FAILED");
    assert_eq!(world.events.errors.load(Ordering::Relaxed), 1);

    let project = world.registry.get_project(&a.id).unwrap().unwrap();
    assert_eq!(project.last_synced_version, 1);
    assert_eq!(
        world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap().len(),
        1
    );

    global
        .db()
        .with_writer(|conn| conn.execute_batch("DROP TRIGGER reject_classes;").map_err(sqlite_err))
        .unwrap();
    let retried = world.aggregator.sync_project(&a.id).unwrap();
    assert_eq!(retried.patterns_added, 1);
    assert_eq!(retried.checkpoint, 2);
    assert_eq!(
        world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap().len(),
        2
    );
}

#[test]
fn recreated_store_is_rejected_until_rebased() {
    let world = World::new();
    let a = world.project("typescript");
    let class_names = PatternContent::naming(ConceptKind::Class, CaseStyle::Pascal);
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    a.learner.import_patterns(&[seed(class_names.clone(), 4, 0.7, &[])]).unwrap();
    a.learner.import_patterns(&[seed(camel_variables(), 6, 0.6, &[])]).unwrap();
    assert_eq!(world.aggregator.sync_project(&a.id).unwrap().checkpoint, 3);

    let fresh = Arc::new(PatternStore::open_in_memory(a.dir.path()).unwrap());
    world.aggregator.attach_store(&a.id, Arc::clone(&fresh));
    let relearned = IncrementalLearner::new(
        a.id.clone(),
        fresh,
        Arc::new(LexicalExtractor::new()),
        Arc::new(FsSourceReader::default()),
        &world.config,
        Arc::clone(&world.dispatcher),
    );
    let snake_variables = PatternContent::naming(ConceptKind::Variable, CaseStyle::Snake);
    relearned.import_patterns(&[seed(snake_variables.clone(), 3, 0.6, &[])]).unwrap();

    let err = world.aggregator.sync_project(&a.id).unwrap_err();
    match &err {
        SyncError::StoreBehindCheckpoint { store_version, checkpoint, .. } => {
            assert_eq!((*store_version, *checkpoint), (1, 3));
        }
        other => panic!("expected StoreBehindCheckpoint, got {other:?}"),
    }
    assert_eq!(err.error_code(), "CONSISTENCY_VIOLATION");
    assert!(!err.is_retryable());
    assert_eq!(world.events.errors.load(Ordering::Relaxed), 1);
    assert_eq!(
        world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap().len(),
        2
    );

    assert_eq!(world.aggregator.rebase_project(&a.id).unwrap(), 2);
    assert!(world
        .aggregator
        .get_aggregations(&AggregationFilter::default())
        .unwrap()
        .is_empty());
    assert_eq!(world.registry.get_project(&a.id).unwrap().unwrap().last_synced_version, 0);

    let result = world.aggregator.sync_project(&a.id).unwrap();
    assert_eq!(result.status, SyncStatus::Complete);
    assert_eq!(result.checkpoint, 1);
    let found = world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].signature, signature(&snake_variables));
}

#[test]
fn unknown_project_cannot_be_rebased() {
    let world = World::new();
    let err = world.aggregator.rebase_project("nope").unwrap_err();
    assert!(matches!(err, SyncError::UnknownProject { .. }));
}

#[test]
fn concurrent_sync_of_same_project_is_rejected() {
    let world = World::new();
    let a = world.project("typescript");
    let guard = world.aggregator.try_begin_sync(&a.id).unwrap();

    let err = world.aggregator.sync_project(&a.id).unwrap_err();
    assert!(matches!(err, SyncError::InProgress { .. }));
    assert!(err.is_retryable());

    drop(guard);
    assert!(world.aggregator.sync_project(&a.id).is_ok());
}

#[test]
fn unknown_project_cannot_sync() {
    let world = World::new();
    let err = world.aggregator.sync_project("nope").unwrap_err();
    assert!(matches!(err, SyncError::UnknownProject { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn filters_narrow_results() {
    let world = World::new();
    let a = world.project("typescript");
    let b = world.project("python");
    let quotes = PatternContent::Style(StyleRule::Quotes {
        quote: QuoteStyle::Single,
    });
    a.learner
        .import_patterns(&[
            seed(camel_variables(), 5, 0.6, &["lang:typescript"]),
            seed(quotes.clone(), 8, 0.7, &["lang:typescript"]),
        ])
        .unwrap();
    b.learner
        .import_patterns(&[seed(quotes, 3, 0.9, &["lang:python"])])
        .unwrap();
    world.aggregator.sync_project(&a.id).unwrap();
    world.aggregator.sync_project(&b.id).unwrap();

    let all = world.aggregator.get_aggregations(&AggregationFilter::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].signature, "style:quotes:single");
    assert_eq!(
        all[0].languages,
        vec!["python".to_string(), "typescript".to_string()]
    );

    let style = AggregationFilter {
        category: Some("style".to_string()),
        ..AggregationFilter::default()
    };
    assert_eq!(world.aggregator.get_aggregations(&style).unwrap().len(), 1);

    let shared = AggregationFilter {
        min_project_count: Some(2),
        ..AggregationFilter::default()
    };
    assert_eq!(world.aggregator.get_aggregations(&shared).unwrap().len(), 1);

    let unanimous = AggregationFilter {
        min_consensus: Some(0.99),
        ..AggregationFilter::default()
    };
    let found = world.aggregator.get_aggregations(&unanimous).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].signature, "style:quotes:single");

    let python = AggregationFilter {
        language: Some("python".to_string()),
        ..AggregationFilter::default()
    };
    assert_eq!(world.aggregator.get_aggregations(&python).unwrap().len(), 1);

    let limited = AggregationFilter {
        limit: Some(1),
        ..AggregationFilter::default()
    };
    assert_eq!(world.aggregator.get_aggregations(&limited).unwrap().len(), 1);
}

#[test]
fn portfolio_view_summarizes_active_projects() {
    let world = World::new();
    let a = world.project("typescript");
    let b = world.project("typescript");
    let c = world.project("python");
    a.learner.import_patterns(&[seed(camel_variables(), 5, 0.6, &[])]).unwrap();
    b.learner.import_patterns(&[seed(camel_variables(), 15, 0.9, &[])]).unwrap();
    for id in [&a.id, &b.id, &c.id] {
        world.aggregator.sync_project(id).unwrap();
    }

    let view = world.aggregator.get_portfolio_view().unwrap();
    assert_eq!(view.total_projects, 3);
    assert_eq!(view.total_patterns, 2);
    assert_eq!(view.total_aggregations, 1);
    assert_eq!(view.top_languages[0].language, "typescript");
    assert_eq!(view.top_languages[0].projects, 2);
    assert_eq!(view.top_languages[1].language, "python");

    world.registry.unlink_project(&c.id).unwrap();
    let view = world.aggregator.get_portfolio_view().unwrap();
    assert_eq!(view.total_projects, 2);
    assert_eq!(view.top_languages.len(), 1);
}

/// Embeds text as counts of a few keywords.
struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn dimensions(&self) -> usize {
        2
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractionError> {
        let count = |word: &str| text.matches(word).count() as f32;
        Ok(vec![count("quote"), count("variable")])
    }
}

#[test]
fn ranked_aggregations_follow_query_similarity() {
    let config = CanonConfig::default();
    let dispatcher = Arc::new(EventDispatcher::new());
    let global = Arc::new(GlobalStore::open_in_memory().unwrap());
    let aggregator = GlobalAggregator::new(Arc::clone(&global), &config, Arc::clone(&dispatcher))
        .with_ranker(SemanticRanker::new(Arc::new(KeywordEmbedder)));
    let registry = ProjectRegistry::new(global, &config, Arc::clone(&dispatcher));

    let dir = TempDir::new().unwrap();
    let id = registry
        .link_project(dir.path(), &ProjectMetadata::default())
        .unwrap()
        .project
        .id;
    let store = Arc::new(PatternStore::open_in_memory(dir.path()).unwrap());
    aggregator.attach_store(&id, Arc::clone(&store));
    IncrementalLearner::new(
        id.clone(),
        store,
        Arc::new(LexicalExtractor::new()),
        Arc::new(FsSourceReader::default()),
        &config,
        dispatcher,
    )
    .import_patterns(&[
        seed(camel_variables(), 50, 0.9, &[]),
        seed(
            PatternContent::Style(StyleRule::Quotes {
                quote: QuoteStyle::Single,
            }),
            2,
            0.5,
            &[],
        ),
    ])
    .unwrap();
    aggregator.sync_project(&id).unwrap();

    let ranked = aggregator
        .get_ranked_aggregations(&AggregationFilter::default(), "quote style")
        .unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].aggregation.signature, "style:quotes:single");
    assert!(ranked[0].score > ranked[1].score);
}
