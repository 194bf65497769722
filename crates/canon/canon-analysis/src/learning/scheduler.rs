//! Bounded worker pool running learner batches.
//!
//! Each registered project owns a coalescing `ChangeQueue`. Submitting
//! changes enqueues them and, if the project is not already scheduled, sends
//! one ticket over a bounded channel. A worker holding a project's ticket
//! drains its queue batch by batch until it is empty, so at most one merge
//! per project is in flight while different projects run in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use canon_core::config::WorkerConfig;
use canon_core::errors::LearnError;
use canon_core::types::{FileChange, Trigger};
use crossbeam_channel::{bounded, Receiver, Sender};
use dashmap::DashMap;

use super::learner::IncrementalLearner;
use super::queue::ChangeQueue;
use super::types::{ChangeBatch, LearningDelta, OriginContext};

type BatchResult = Result<LearningDelta, LearnError>;

struct ProjectSlot {
    learner: Arc<IncrementalLearner>,
    queue: Mutex<ChangeQueue>,
    /// True while a ticket for this project is queued or being worked.
    scheduled: AtomicBool,
    results: Mutex<Vec<BatchResult>>,
}

struct Shared {
    slots: DashMap<String, Arc<ProjectSlot>>,
    outstanding: Mutex<usize>,
    idle: Condvar,
    max_batch_files: usize,
}

pub struct LearningScheduler {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl LearningScheduler {
    pub fn new(config: &WorkerConfig) -> Self {
        let shared = Arc::new(Shared {
            slots: DashMap::new(),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
            max_batch_files: config.effective_max_batch_files(),
        });
        let (sender, receiver) = bounded::<String>(config.effective_queue_capacity());

        let mut workers = Vec::new();
        for index in 0..config.effective_threads() {
            let shared = Arc::clone(&shared);
            let receiver = receiver.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("canon-learner-{index}"))
                .spawn(move || worker_loop(&shared, &receiver));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!(index, error = %e, "failed to spawn learner worker"),
            }
        }
        tracing::debug!(workers = workers.len(), "learning scheduler started");

        Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Register a project's learner. Replaces any previous registration.
    pub fn register(&self, learner: Arc<IncrementalLearner>) {
        let project_id = learner.project_id().to_string();
        self.shared.slots.insert(
            project_id,
            Arc::new(ProjectSlot {
                learner,
                queue: Mutex::new(ChangeQueue::new()),
                scheduled: AtomicBool::new(false),
                results: Mutex::new(Vec::new()),
            }),
        );
    }

    /// Forget a project. Pending changes are dropped; a running batch finishes.
    pub fn unregister(&self, project_id: &str) -> bool {
        match self.shared.slots.remove(project_id) {
            Some((_, slot)) => {
                // The worker running this slot still holds it; leave it nothing to drain.
                lock(&slot.queue).clear();
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, project_id: &str) -> bool {
        self.shared.slots.contains_key(project_id)
    }

    /// Queue changes for a project and make sure a worker will pick them up.
    pub fn submit(
        &self,
        project_id: &str,
        changes: Vec<FileChange>,
        trigger: Trigger,
    ) -> Result<(), LearnError> {
        let slot = self.slot(project_id)?;
        {
            let mut queue = lock(&slot.queue);
            for change in changes {
                queue.push(change, trigger);
            }
        }
        self.schedule(project_id, &slot)
    }

    /// Drop every queued change of a project that has not started yet.
    /// Returns the number of changes dropped.
    pub fn cancel_pending(&self, project_id: &str) -> Result<usize, LearnError> {
        let slot = self.slot(project_id)?;
        let dropped = lock(&slot.queue).clear();
        if dropped > 0 {
            tracing::debug!(project_id, changes_superseded = dropped, "pending changes cancelled");
        }
        Ok(dropped)
    }

    /// Changes queued for a project and not yet drained.
    pub fn pending(&self, project_id: &str) -> usize {
        self.shared
            .slots
            .get(project_id)
            .map_or(0, |slot| lock(&slot.queue).len())
    }

    /// Take the results of every batch run for a project since the last call.
    pub fn take_results(&self, project_id: &str) -> Vec<BatchResult> {
        match self.shared.slots.get(project_id) {
            Some(slot) => std::mem::take(&mut *lock(&slot.results)),
            None => Vec::new(),
        }
    }

    /// Block until no project has queued or running work.
    pub fn wait_idle(&self) {
        let mut outstanding = lock(&self.shared.outstanding);
        while *outstanding > 0 {
            outstanding = self
                .shared
                .idle
                .wait(outstanding)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Stop accepting work and join the workers once the channel drains.
    pub fn shutdown(&self) {
        lock(&self.sender).take();
        let workers = std::mem::take(&mut *lock(&self.workers));
        for handle in workers {
            if handle.join().is_err() {
                tracing::warn!("learner worker panicked");
            }
        }
    }

    fn slot(&self, project_id: &str) -> Result<Arc<ProjectSlot>, LearnError> {
        self.shared
            .slots
            .get(project_id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| LearnError::InvalidBatch {
                reason: format!("project {project_id} has no registered learner"),
            })
    }

    fn schedule(&self, project_id: &str, slot: &ProjectSlot) -> Result<(), LearnError> {
        if slot.scheduled.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        *lock(&self.shared.outstanding) += 1;

        let sent = match lock(&self.sender).as_ref() {
            Some(sender) => sender.send(project_id.to_string()).is_ok(),
            None => false,
        };
        if !sent {
            slot.scheduled.store(false, Ordering::Release);
            finish_ticket(&self.shared);
            return Err(LearnError::InvalidBatch {
                reason: "learning scheduler is shut down".to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for LearningScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared, receiver: &Receiver<String>) {
    for project_id in receiver.iter() {
        let slot = shared
            .slots
            .get(&project_id)
            .map(|slot| Arc::clone(slot.value()));
        if let Some(slot) = slot {
            run_slot(&project_id, &slot, shared.max_batch_files);
        }
        finish_ticket(shared);
    }
}

/// Drain one project's queue. Only the ticket holder runs this.
fn run_slot(project_id: &str, slot: &ProjectSlot, max_batch_files: usize) {
    loop {
        let drained = {
            let mut queue = lock(&slot.queue);
            let batch = queue.drain_batch(max_batch_files);
            if batch.is_some() {
                tracing::trace!(
                    project_id,
                    changes_superseded = queue.superseded(),
                    remaining = queue.len(),
                    "batch drained"
                );
            }
            batch
        };

        match drained {
            Some(batch) => {
                let origin = OriginContext {
                    trigger: batch.trigger,
                    revision: batch.revision,
                    cancel: None,
                };
                let result = slot
                    .learner
                    .process_changes(&ChangeBatch::new(batch.changes), &origin);
                if let Err(e) = &result {
                    tracing::warn!(project_id, error = %e, "scheduled batch failed");
                }
                lock(&slot.results).push(result);
            }
            None => {
                slot.scheduled.store(false, Ordering::Release);
                // Changes submitted between the drain and the store above
                // found the project still scheduled; pick them up here.
                let more = !lock(&slot.queue).is_empty();
                if more && !slot.scheduled.swap(true, Ordering::AcqRel) {
                    continue;
                }
                return;
            }
        }
    }
}

fn finish_ticket(shared: &Shared) {
    let mut outstanding = lock(&shared.outstanding);
    *outstanding = outstanding.saturating_sub(1);
    if *outstanding == 0 {
        shared.idle.notify_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
