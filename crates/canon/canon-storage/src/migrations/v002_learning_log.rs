//! v002: learning delta log, per-delta pattern operations, removal tombstones.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS learning_deltas (
    id TEXT PRIMARY KEY,
    trigger_kind TEXT NOT NULL,
    mode TEXT NOT NULL,
    revision TEXT,
    files_touched INTEGER NOT NULL,
    concepts_added INTEGER NOT NULL,
    concepts_modified INTEGER NOT NULL,
    concepts_removed INTEGER NOT NULL,
    patterns_added INTEGER NOT NULL,
    patterns_modified INTEGER NOT NULL,
    patterns_removed INTEGER NOT NULL,
    duration_ms INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    preceding_version INTEGER NOT NULL,
    resulting_version INTEGER NOT NULL UNIQUE,
    partial_degradation INTEGER NOT NULL DEFAULT 0,
    degraded_files TEXT NOT NULL DEFAULT '[]'
) STRICT;

CREATE TABLE IF NOT EXISTS delta_operations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resulting_version INTEGER NOT NULL,
    seq INTEGER NOT NULL,
    op TEXT NOT NULL CHECK (op IN ('upsert', 'remove')),
    pattern_id TEXT NOT NULL,
    payload TEXT,
    UNIQUE (resulting_version, seq)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_delta_ops_version ON delta_operations(resulting_version);

CREATE TABLE IF NOT EXISTS pattern_tombstones (
    pattern_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    pattern_type TEXT NOT NULL,
    content TEXT NOT NULL,
    removed_at INTEGER NOT NULL,
    PRIMARY KEY (pattern_id, version)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_tombstones_version ON pattern_tombstones(version);
"#;
