//! processChanges, plus the queued form that goes through the learning
//! scheduler: queueChanges and awaitLearning.

use canon_analysis::learning::{ChangeBatch, LearningDelta, OriginContext};
use canon_core::types::{FileChange, Trigger};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::runtime::CanonRuntime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessChangesArgs {
    pub project_id: String,
    pub changes: Vec<FileChange>,
    #[serde(default = "default_trigger")]
    pub trigger: Trigger,
    /// Version-control revision the batch belongs to.
    #[serde(default)]
    pub revision: Option<String>,
}

fn default_trigger() -> Trigger {
    Trigger::Manual
}

/// Learn a batch of file changes into the project's pattern store.
/// Registry stats are left to the next sync.
pub fn process_changes(rt: &CanonRuntime, args: ProcessChangesArgs) -> Result<LearningDelta, ApiError> {
    let handle = rt.project(&args.project_id)?;
    let origin = OriginContext {
        revision: args.revision,
        ..OriginContext::new(args.trigger)
    };
    Ok(handle
        .learner
        .process_changes(&ChangeBatch::new(args.changes), &origin)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueChangesArgs {
    pub project_id: String,
    pub changes: Vec<FileChange>,
    #[serde(default = "default_queued_trigger")]
    pub trigger: Trigger,
}

fn default_queued_trigger() -> Trigger {
    Trigger::Watch
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedChanges {
    pub project_id: String,
    /// Changes still waiting for a worker after coalescing.
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitLearningArgs {
    pub project_id: String,
}

/// Outcome of every queued batch run since the last `await_learning`.
#[derive(Debug, Clone, Serialize)]
pub struct LearningResults {
    pub project_id: String,
    pub deltas: Vec<LearningDelta>,
    pub errors: Vec<ApiError>,
}

/// Queue changes for background learning. Pending changes to the same path
/// coalesce; batches run manual first, then git-commit, then watch.
pub fn queue_changes(rt: &CanonRuntime, args: QueueChangesArgs) -> Result<QueuedChanges, ApiError> {
    rt.project(&args.project_id)?;
    rt.scheduler()
        .submit(&args.project_id, args.changes, args.trigger)?;
    Ok(QueuedChanges {
        pending: rt.scheduler().pending(&args.project_id),
        project_id: args.project_id,
    })
}

/// Block until queued learning is idle and collect the project's results.
pub fn await_learning(rt: &CanonRuntime, args: AwaitLearningArgs) -> Result<LearningResults, ApiError> {
    rt.project(&args.project_id)?;
    rt.scheduler().wait_idle();
    let mut deltas = Vec::new();
    let mut errors = Vec::new();
    for result in rt.scheduler().take_results(&args.project_id) {
        match result {
            Ok(delta) => deltas.push(delta),
            Err(e) => errors.push(ApiError::from(e)),
        }
    }
    Ok(LearningResults {
        project_id: args.project_id,
        deltas,
        errors,
    })
}
