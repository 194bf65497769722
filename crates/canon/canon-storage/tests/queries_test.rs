//! Project store query tests.

use canon_storage::migrations::Schema;
use canon_storage::queries::concepts::{self, ConceptRow};
use canon_storage::queries::deltas::{self, DeltaOperationRow, DeltaRow};
use canon_storage::queries::evidence::{self, EvidenceRow};
use canon_storage::queries::exceptions;
use canon_storage::queries::files::{self, TrackedFileRow};
use canon_storage::queries::patterns::{self, PatternRow};
use canon_storage::queries::tombstones::{self, TombstoneRow};
use canon_storage::queries::violations::{self, ViolationRow};
use canon_storage::DatabaseManager;

fn project_db() -> DatabaseManager {
    DatabaseManager::open_in_memory(Schema::Project).unwrap()
}

fn pattern(id: &str, slot: &str, frequency: i64, confidence: f64, version: i64) -> PatternRow {
    PatternRow {
        pattern_id: id.to_string(),
        pattern_type: "naming".to_string(),
        slot: slot.to_string(),
        content: "{}".to_string(),
        frequency,
        baseline: 0,
        confidence,
        contexts: "[]".to_string(),
        examples: "[]".to_string(),
        version,
        created_at: 100,
        last_seen: 100,
    }
}

#[test]
fn pattern_upsert_keeps_created_at() {
    let db = project_db();
    db.with_writer(|conn| {
        patterns::upsert_pattern(conn, &pattern("p1", "naming:variable", 1, 0.55, 1))?;
        let mut updated = pattern("p1", "naming:variable", 3, 0.6, 2);
        updated.created_at = 999;
        updated.last_seen = 500;
        patterns::upsert_pattern(conn, &updated)
    })
    .unwrap();

    let row = db
        .with_reader(|conn| patterns::get_pattern(conn, "p1"))
        .unwrap()
        .unwrap();
    assert_eq!(row.frequency, 3);
    assert_eq!(row.version, 2);
    assert_eq!(row.created_at, 100);
    assert_eq!(row.last_seen, 500);
}

#[test]
fn slot_query_orders_by_frequency_then_confidence() {
    let db = project_db();
    db.with_writer(|conn| {
        patterns::upsert_pattern(conn, &pattern("a", "naming:variable", 2, 0.9, 1))?;
        patterns::upsert_pattern(conn, &pattern("b", "naming:variable", 7, 0.6, 1))?;
        patterns::upsert_pattern(conn, &pattern("c", "naming:variable", 7, 0.7, 1))?;
        patterns::upsert_pattern(conn, &pattern("d", "naming:function", 50, 0.9, 1))
    })
    .unwrap();

    let rows = db
        .with_reader(|conn| patterns::patterns_in_slot(conn, "naming:variable"))
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.pattern_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[test]
fn patterns_since_filters_by_version() {
    let db = project_db();
    db.with_writer(|conn| {
        patterns::upsert_pattern(conn, &pattern("a", "s", 1, 0.5, 1))?;
        patterns::upsert_pattern(conn, &pattern("b", "s", 1, 0.5, 3))?;
        patterns::upsert_pattern(conn, &pattern("c", "s", 1, 0.5, 2))
    })
    .unwrap();
    let rows = db.with_reader(|conn| patterns::patterns_since(conn, 1)).unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.pattern_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b"]);
}

#[test]
fn concepts_and_evidence_rekey_on_rename() {
    let db = project_db();
    db.with_writer(|conn| {
        concepts::insert_concepts(
            conn,
            &[ConceptRow {
                file_path: "src/old.ts".into(),
                name: "userName".into(),
                kind: "variable".into(),
                confidence: 0.9,
                line_start: 1,
                line_end: 1,
            }],
        )?;
        evidence::insert_evidence(
            conn,
            &[EvidenceRow {
                pattern_id: "p1".into(),
                file_path: "src/old.ts".into(),
                line: 1,
                snippet: "let userName = 1".into(),
            }],
        )?;
        files::upsert_tracked_file(
            conn,
            &TrackedFileRow {
                file_path: "src/old.ts".into(),
                language: Some("typescript".into()),
                content_hash: "abc".into(),
                degraded: false,
                analyzed_at: 1,
                revision: None,
            },
        )?;
        assert_eq!(concepts::rekey_concepts(conn, "src/old.ts", "src/new.ts")?, 1);
        assert_eq!(evidence::rekey_evidence(conn, "src/old.ts", "src/new.ts")?, 1);
        assert_eq!(files::rekey_tracked_file(conn, "src/old.ts", "src/new.ts")?, 1);
        Ok(())
    })
    .unwrap();

    db.with_reader(|conn| {
        assert!(concepts::concepts_for_file(conn, "src/old.ts")?.is_empty());
        assert_eq!(concepts::concepts_for_file(conn, "src/new.ts")?.len(), 1);
        assert_eq!(evidence::count_for_pattern(conn, "p1")?, 1);
        let files = evidence::files_for_pattern(conn, "p1")?;
        assert_eq!(files, vec![("src/new.ts".to_string(), Some("typescript".to_string()))]);
        Ok(())
    })
    .unwrap();
}

#[test]
fn examples_are_bounded_and_stable() {
    let db = project_db();
    db.with_writer(|conn| {
        let rows: Vec<EvidenceRow> = (0..8)
            .map(|i| EvidenceRow {
                pattern_id: "p".into(),
                file_path: format!("src/f{}.ts", 7 - i),
                line: 1,
                snippet: "x".into(),
            })
            .collect();
        evidence::insert_evidence(conn, &rows)
    })
    .unwrap();
    let examples = db
        .with_reader(|conn| evidence::examples_for_pattern(conn, "p", 5))
        .unwrap();
    assert_eq!(examples.len(), 5);
    assert_eq!(examples[0].file_path, "src/f0.ts");
    assert_eq!(examples[4].file_path, "src/f4.ts");
}

#[test]
fn delta_log_and_operations_are_ordered() {
    let db = project_db();
    db.with_writer(|conn| {
        for v in [2_i64, 1] {
            deltas::insert_delta(
                conn,
                &DeltaRow {
                    id: format!("d{v}"),
                    trigger: "manual".into(),
                    mode: "incremental".into(),
                    revision: None,
                    files_touched: 1,
                    concepts_added: 1,
                    concepts_modified: 0,
                    concepts_removed: 0,
                    patterns_added: 1,
                    patterns_modified: 0,
                    patterns_removed: 0,
                    duration_ms: 1,
                    applied_at: 10,
                    preceding_version: v - 1,
                    resulting_version: v,
                    partial_degradation: false,
                    degraded_files: "[]".into(),
                },
            )?;
            deltas::insert_operation(
                conn,
                &DeltaOperationRow {
                    resulting_version: v,
                    seq: 0,
                    op: deltas::OP_UPSERT.into(),
                    pattern_id: format!("p{v}"),
                    payload: Some("{}".into()),
                },
            )?;
        }
        Ok(())
    })
    .unwrap();

    let log = db.with_reader(deltas::list_deltas).unwrap();
    assert_eq!(log.iter().map(|d| d.resulting_version).collect::<Vec<_>>(), vec![1, 2]);
    let ops = db.with_reader(deltas::list_operations).unwrap();
    assert_eq!(ops[0].pattern_id, "p1");
    assert_eq!(db.with_reader(deltas::latest_delta).unwrap().unwrap().id, "d2");
}

#[test]
fn duplicate_resulting_version_is_rejected() {
    let db = project_db();
    let row = DeltaRow {
        id: "a".into(),
        trigger: "watch".into(),
        mode: "incremental".into(),
        revision: None,
        files_touched: 0,
        concepts_added: 0,
        concepts_modified: 0,
        concepts_removed: 0,
        patterns_added: 0,
        patterns_modified: 0,
        patterns_removed: 0,
        duration_ms: 0,
        applied_at: 0,
        preceding_version: 0,
        resulting_version: 1,
        partial_degradation: false,
        degraded_files: "[]".into(),
    };
    db.with_writer(|conn| deltas::insert_delta(conn, &row)).unwrap();
    let dup = DeltaRow {
        id: "b".into(),
        ..row
    };
    assert!(db.with_writer(|conn| deltas::insert_delta(conn, &dup)).is_err());
}

#[test]
fn tombstones_since_checkpoint() {
    let db = project_db();
    db.with_writer(|conn| {
        for v in 1..=3 {
            tombstones::insert_tombstone(
                conn,
                &TombstoneRow {
                    pattern_id: format!("p{v}"),
                    version: v,
                    pattern_type: "naming".into(),
                    content: "{}".into(),
                    removed_at: 0,
                },
            )?;
        }
        Ok(())
    })
    .unwrap();
    let rows = db.with_reader(|conn| tombstones::tombstones_since(conn, 1)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].pattern_id, "p2");
}

#[test]
fn exceptions_are_append_only_per_pattern() {
    let db = project_db();
    db.with_writer(|conn| {
        exceptions::insert_exception(conn, "p1", "legacy/**", "old code", 1)?;
        exceptions::insert_exception(conn, "p1", "vendor/**", "third party", 2)?;
        exceptions::insert_exception(conn, "p2", "**", "disabled", 3)?;
        Ok(())
    })
    .unwrap();
    let p1 = db
        .with_reader(|conn| exceptions::exceptions_for_pattern(conn, "p1"))
        .unwrap();
    assert_eq!(p1.len(), 2);
    assert_eq!(p1[0].scope_glob, "legacy/**");
    assert_eq!(db.with_reader(exceptions::list_exceptions).unwrap().len(), 3);
}

#[test]
fn violation_history_round_trip() {
    let db = project_db();
    db.with_writer(|conn| {
        violations::insert_violations(
            conn,
            &[ViolationRow {
                pattern_id: "p1".into(),
                file_path: "src/a.ts".into(),
                line_start: 3,
                line_end: 3,
                severity: "high".into(),
                message: "m".into(),
                suggested_fix: Some("userId".into()),
                checked_at: 5,
            }],
        )
    })
    .unwrap();
    let rows = db
        .with_reader(|conn| violations::violations_for_file(conn, "src/a.ts"))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].suggested_fix.as_deref(), Some("userId"));
    assert_eq!(db.with_reader(violations::count_violations).unwrap(), 1);
}
