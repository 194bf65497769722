//! Shared constants for the Canon pattern engine.

/// Canon version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the per-project data directory holding the pattern store.
pub const DATA_DIR_NAME: &str = ".canon";

/// File name of the per-project pattern store inside the data directory.
pub const PROJECT_DB_FILE: &str = "patterns.db";

/// File name of the global aggregation database.
pub const GLOBAL_DB_FILE: &str = "global.db";

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = "canon.toml";

/// Maximum file size in bytes read for extraction (default: 1MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Maximum number of example snippets kept per pattern.
pub const DEFAULT_MAX_EXAMPLES: usize = 5;

/// Window, in days, within which a pattern counts as recently seen.
pub const DEFAULT_RECENCY_WINDOW_DAYS: u32 = 7;

/// Fraction of the remaining distance to 1.0 granted as a recency bonus.
pub const DEFAULT_RECENCY_BONUS: f64 = 0.05;

/// Default re-learning threshold (fraction of tracked files changed).
pub const DEFAULT_RELEARN_THRESHOLD: f64 = 0.10;

/// Confidence at or above which a violation is high severity.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.85;

/// Confidence at or above which a violation is medium severity.
pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 0.60;

/// Score penalty per high severity violation.
pub const DEFAULT_PENALTY_HIGH: u32 = 15;

/// Score penalty per medium severity violation.
pub const DEFAULT_PENALTY_MEDIUM: u32 = 7;

/// Score penalty per low severity violation.
pub const DEFAULT_PENALTY_LOW: u32 = 2;

/// Capacity of the compiled exception glob cache.
pub const DEFAULT_GLOB_CACHE_CAPACITY: u64 = 1_024;

/// Attempts made for a compare-and-swap aggregation upsert before giving up.
pub const DEFAULT_CAS_MAX_ATTEMPTS: u32 = 8;

/// Number of languages reported in the portfolio view.
pub const DEFAULT_TOP_LANGUAGES: usize = 5;

/// Default result limit for aggregation queries.
pub const DEFAULT_AGGREGATION_LIMIT: usize = 100;

/// Default learner worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default capacity of the learner ticket channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

/// Maximum files merged in a single scheduled batch.
pub const DEFAULT_MAX_BATCH_FILES: usize = 500;

/// Default read connections per file-backed database.
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
