//! Global v001: project registry.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    primary_language TEXT,
    frameworks TEXT NOT NULL DEFAULT '[]',
    linked_at INTEGER NOT NULL,
    unlinked_at INTEGER,
    last_synced_version INTEGER NOT NULL DEFAULT 0,
    last_synced_at INTEGER,
    pattern_count INTEGER NOT NULL DEFAULT 0,
    concept_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
) STRICT;

CREATE INDEX IF NOT EXISTS idx_projects_active ON projects(is_active);
"#;
