//! Learning scheduler tests: per-project serialization across a worker pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use canon_analysis::extraction::{FsSourceReader, LexicalExtractor};
use canon_analysis::learning::{IncrementalLearner, LearningScheduler};
use canon_core::config::{CanonConfig, WorkerConfig};
use canon_core::errors::{ExtractionError, LearnError};
use canon_core::events::EventDispatcher;
use canon_core::traits::ConceptExtractor;
use canon_core::types::{Extraction, FileChange, Trigger};
use canon_storage::PatternStore;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tempfile::TempDir;

/// Blocks the first extraction until released, so later submissions queue
/// up behind a running batch.
struct HeldExtractor {
    inner: LexicalExtractor,
    armed: AtomicBool,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl ConceptExtractor for HeldExtractor {
    fn extract(&self, file_path: &str, content: &str) -> Result<Extraction, ExtractionError> {
        if self.armed.swap(false, Ordering::AcqRel) {
            self.entered.send(()).unwrap();
            self.release.recv().unwrap();
        }
        self.inner.extract(file_path, content)
    }
}

/// A held extractor plus the channels to observe and release it.
fn held_extractor() -> (Arc<HeldExtractor>, Receiver<()>, Sender<()>) {
    let (entered_tx, entered_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let extractor = Arc::new(HeldExtractor {
        inner: LexicalExtractor::new(),
        armed: AtomicBool::new(true),
        entered: entered_tx,
        release: release_rx,
    });
    (extractor, entered_rx, release_tx)
}

fn learner_with(id: &str, dir: &TempDir, extractor: Arc<dyn ConceptExtractor>) -> Arc<IncrementalLearner> {
    Arc::new(IncrementalLearner::new(
        id,
        Arc::new(PatternStore::open_in_memory(dir.path()).unwrap()),
        extractor,
        Arc::new(FsSourceReader::default()),
        &CanonConfig::default(),
        Arc::new(EventDispatcher::new()),
    ))
}

fn learner(id: &str, dir: &TempDir) -> Arc<IncrementalLearner> {
    learner_with(id, dir, Arc::new(LexicalExtractor::new()))
}

fn write_files(dir: &TempDir, count: usize) -> Vec<FileChange> {
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    (0..count)
        .map(|i| {
            let rel = format!("src/file{i}.ts");
            std::fs::write(dir.path().join(&rel), format!("const itemCount{i} = {i};\n")).unwrap();
            FileChange::added(rel)
        })
        .collect()
}

fn config(threads: usize, max_batch_files: usize) -> WorkerConfig {
    WorkerConfig {
        threads: Some(threads),
        queue_capacity: Some(16),
        max_batch_files: Some(max_batch_files),
    }
}

#[test]
fn submitted_changes_are_learned() {
    let dir = TempDir::new().unwrap();
    let learner = learner("p1", &dir);
    let scheduler = LearningScheduler::new(&config(2, 500));
    scheduler.register(Arc::clone(&learner));

    scheduler
        .submit("p1", write_files(&dir, 3), Trigger::Watch)
        .unwrap();
    scheduler.wait_idle();

    let results = scheduler.take_results("p1");
    assert!(!results.is_empty());
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(scheduler.pending("p1"), 0);
    assert_eq!(learner.patterns().unwrap()[0].frequency, 3);
    scheduler.shutdown();
}

#[test]
fn batches_respect_file_limit_and_chain_versions() {
    let dir = TempDir::new().unwrap();
    let learner = learner("p1", &dir);
    let scheduler = LearningScheduler::new(&config(2, 2));
    scheduler.register(Arc::clone(&learner));

    scheduler
        .submit("p1", write_files(&dir, 5), Trigger::Manual)
        .unwrap();
    scheduler.wait_idle();

    let results = scheduler.take_results("p1");
    assert_eq!(results.len(), 3);
    let history = learner.delta_history().unwrap();
    assert_eq!(history.len(), 3);
    for pair in history.windows(2) {
        assert_eq!(pair[0].resulting_version, pair[1].preceding_version);
    }
    assert_eq!(learner.store().current_version().unwrap(), 3);
}

#[test]
fn projects_run_independently() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let a = learner("a", &dir_a);
    let b = learner("b", &dir_b);
    let scheduler = LearningScheduler::new(&config(4, 500));
    scheduler.register(Arc::clone(&a));
    scheduler.register(Arc::clone(&b));

    scheduler.submit("a", write_files(&dir_a, 2), Trigger::Watch).unwrap();
    scheduler.submit("b", write_files(&dir_b, 4), Trigger::Watch).unwrap();
    scheduler.wait_idle();

    assert_eq!(a.patterns().unwrap()[0].frequency, 2);
    assert_eq!(b.patterns().unwrap()[0].frequency, 4);
}

#[test]
fn unregistered_project_is_rejected() {
    let scheduler = LearningScheduler::new(&config(1, 500));
    let err = scheduler
        .submit("ghost", vec![FileChange::added("a.ts")], Trigger::Watch)
        .unwrap_err();
    assert!(matches!(err, LearnError::InvalidBatch { .. }));
    assert!(!scheduler.is_registered("ghost"));
}

#[test]
fn submit_after_shutdown_fails() {
    let dir = TempDir::new().unwrap();
    let scheduler = LearningScheduler::new(&config(1, 500));
    scheduler.register(learner("p1", &dir));
    scheduler.shutdown();

    let err = scheduler
        .submit("p1", write_files(&dir, 1), Trigger::Watch)
        .unwrap_err();
    assert!(matches!(err, LearnError::InvalidBatch { .. }));
    scheduler.wait_idle();
}

#[test]
fn cancelled_changes_never_merge() {
    let dir = TempDir::new().unwrap();
    let (extractor, entered, release) = held_extractor();
    let learner = learner_with("p1", &dir, extractor);
    let scheduler = LearningScheduler::new(&config(2, 500));
    scheduler.register(Arc::clone(&learner));

    let mut changes = write_files(&dir, 3).into_iter();
    scheduler
        .submit("p1", changes.next().into_iter().collect(), Trigger::Watch)
        .unwrap();
    entered.recv().unwrap();
    scheduler.submit("p1", changes.collect(), Trigger::Manual).unwrap();
    assert_eq!(scheduler.pending("p1"), 2);

    assert_eq!(scheduler.cancel_pending("p1").unwrap(), 2);
    assert_eq!(scheduler.pending("p1"), 0);
    release.send(()).unwrap();
    scheduler.wait_idle();

    let results = scheduler.take_results("p1");
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
    assert_eq!(learner.patterns().unwrap()[0].frequency, 1);
    assert_eq!(learner.store().current_version().unwrap(), 1);
    assert_eq!(scheduler.cancel_pending("p1").unwrap(), 0);
}

#[test]
fn unregister_lets_the_running_batch_finish_and_drops_the_rest() {
    let dir = TempDir::new().unwrap();
    let (extractor, entered, release) = held_extractor();
    let learner = learner_with("p1", &dir, extractor);
    let scheduler = LearningScheduler::new(&config(2, 500));
    scheduler.register(Arc::clone(&learner));

    let mut changes = write_files(&dir, 2).into_iter();
    scheduler
        .submit("p1", changes.next().into_iter().collect(), Trigger::Watch)
        .unwrap();
    entered.recv().unwrap();
    scheduler.submit("p1", changes.collect(), Trigger::Watch).unwrap();

    assert!(scheduler.unregister("p1"));
    assert!(!scheduler.is_registered("p1"));
    release.send(()).unwrap();
    scheduler.wait_idle();

    assert_eq!(learner.patterns().unwrap()[0].frequency, 1);
    assert_eq!(learner.store().current_version().unwrap(), 1);
    assert!(!scheduler.unregister("p1"));
    let err = scheduler
        .submit("p1", vec![FileChange::added("src/file1.ts")], Trigger::Watch)
        .unwrap_err();
    assert!(matches!(err, LearnError::InvalidBatch { .. }));
}
