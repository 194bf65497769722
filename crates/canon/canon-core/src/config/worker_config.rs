//! Learner worker pool configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads processing learner batches. Default: 4.
    pub threads: Option<usize>,
    /// Bound of the project ticket channel. Default: 1024.
    pub queue_capacity: Option<usize>,
    /// Maximum files merged per scheduled batch. Default: 500.
    pub max_batch_files: Option<usize>,
}

impl WorkerConfig {
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(constants::DEFAULT_WORKER_THREADS)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or(constants::DEFAULT_QUEUE_CAPACITY)
    }

    pub fn effective_max_batch_files(&self) -> usize {
        self.max_batch_files
            .unwrap_or(constants::DEFAULT_MAX_BATCH_FILES)
    }
}
