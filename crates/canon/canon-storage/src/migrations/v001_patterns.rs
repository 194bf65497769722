//! v001: store metadata, patterns, concepts, evidence, tracked files.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
) STRICT;

INSERT OR IGNORE INTO store_meta (name, value) VALUES ('version', 0);

CREATE TABLE IF NOT EXISTS patterns (
    pattern_id TEXT PRIMARY KEY,
    pattern_type TEXT NOT NULL,
    slot TEXT NOT NULL,
    content TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    baseline INTEGER NOT NULL DEFAULT 0,
    confidence REAL NOT NULL,
    contexts TEXT NOT NULL DEFAULT '[]',
    examples TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    last_seen INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_patterns_slot ON patterns(slot);
CREATE INDEX IF NOT EXISTS idx_patterns_type ON patterns(pattern_type);
CREATE INDEX IF NOT EXISTS idx_patterns_version ON patterns(version);

CREATE TABLE IF NOT EXISTS concepts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    confidence REAL NOT NULL,
    line_start INTEGER NOT NULL,
    line_end INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_concepts_file ON concepts(file_path);

CREATE TABLE IF NOT EXISTS evidence (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    line INTEGER NOT NULL,
    snippet TEXT NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_evidence_pattern ON evidence(pattern_id);
CREATE INDEX IF NOT EXISTS idx_evidence_file ON evidence(file_path);

CREATE TABLE IF NOT EXISTS tracked_files (
    file_path TEXT PRIMARY KEY,
    language TEXT,
    content_hash TEXT NOT NULL DEFAULT '',
    degraded INTEGER NOT NULL DEFAULT 0,
    analyzed_at INTEGER NOT NULL,
    revision TEXT
) STRICT;
"#;
