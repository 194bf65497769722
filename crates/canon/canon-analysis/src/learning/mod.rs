//! Incremental learning: change batches in, atomic pattern store merges out.
//!
//! `queue` coalesces pending changes per project, `scheduler` runs them on a
//! bounded worker pool, `learner` performs the merge, `replay` rebuilds the
//! pattern table from the delta log.

pub mod learner;
pub mod queue;
pub mod relearning;
pub mod replay;
pub mod scheduler;
pub mod types;

pub use learner::IncrementalLearner;
pub use queue::{ChangeQueue, DrainedBatch};
pub use relearning::{determine_mode, should_relearn, LearningMode};
pub use replay::{replay_deltas, verify_replay};
pub use scheduler::LearningScheduler;
pub use types::{ChangeBatch, LearningDelta, OriginContext, PatternSeed};
