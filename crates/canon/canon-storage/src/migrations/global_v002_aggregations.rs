//! Global v002: signature-keyed aggregations and their per-project occurrences.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pattern_aggregations (
    signature TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    aggregated_confidence REAL NOT NULL,
    consensus_score REAL NOT NULL,
    occurrence_count INTEGER NOT NULL,
    languages TEXT NOT NULL DEFAULT '[]',
    revision INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_aggregations_category ON pattern_aggregations(category);
CREATE INDEX IF NOT EXISTS idx_aggregations_rank
    ON pattern_aggregations(occurrence_count DESC, aggregated_confidence DESC);

CREATE TABLE IF NOT EXISTS aggregation_occurrences (
    signature TEXT NOT NULL,
    project_id TEXT NOT NULL,
    pattern_id TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    confidence REAL NOT NULL,
    languages TEXT NOT NULL DEFAULT '[]',
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (signature, project_id, pattern_id)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_occurrences_project ON aggregation_occurrences(project_id);
CREATE INDEX IF NOT EXISTS idx_occurrences_pattern ON aggregation_occurrences(project_id, pattern_id);
"#;
