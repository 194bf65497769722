//! v003: pattern exceptions and violation history.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pattern_exceptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern_id TEXT NOT NULL,
    scope_glob TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_exceptions_pattern ON pattern_exceptions(pattern_id);

CREATE TABLE IF NOT EXISTS violation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    line_start INTEGER NOT NULL,
    line_end INTEGER NOT NULL,
    severity TEXT NOT NULL,
    message TEXT NOT NULL,
    suggested_fix TEXT,
    checked_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_violations_file ON violation_history(file_path);
CREATE INDEX IF NOT EXISTS idx_violations_pattern ON violation_history(pattern_id);
"#;
