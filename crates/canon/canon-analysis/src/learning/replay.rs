//! Delta log replay.
//!
//! Every merge records the full state of each pattern it upserted and the id
//! of each pattern it removed. Applying those operations in version order
//! from an empty table reproduces the stored patterns exactly.

use std::collections::BTreeMap;

use canon_core::errors::StorageError;
use canon_storage::queries::deltas::{self, OP_REMOVE, OP_UPSERT};
use canon_storage::queries::patterns;
use canon_storage::PatternStore;
use rusqlite::Connection;

use crate::patterns::types::from_json;
use crate::patterns::Pattern;

/// Rebuild the pattern table from the operation log, ordered by pattern id.
pub fn replay_deltas(conn: &Connection) -> Result<Vec<Pattern>, StorageError> {
    let mut table: BTreeMap<String, Pattern> = BTreeMap::new();
    for op in deltas::list_operations(conn)? {
        match op.op.as_str() {
            OP_UPSERT => {
                let payload = op.payload.as_deref().ok_or_else(|| StorageError::Serialization {
                    entity: "delta operation".to_string(),
                    message: format!(
                        "upsert of {} at version {} has no payload",
                        op.pattern_id, op.resulting_version
                    ),
                })?;
                let pattern: Pattern = from_json("delta operation payload", payload)?;
                table.insert(op.pattern_id, pattern);
            }
            OP_REMOVE => {
                table.remove(&op.pattern_id);
            }
            other => {
                return Err(StorageError::Serialization {
                    entity: "delta operation".to_string(),
                    message: format!("unknown operation '{other}'"),
                })
            }
        }
    }
    Ok(table.into_values().collect())
}

/// True when replaying the log yields exactly the stored patterns.
pub fn verify_replay(store: &PatternStore) -> Result<bool, StorageError> {
    store.db().with_reader(|conn| {
        let replayed = replay_deltas(conn)?;
        let stored = patterns::list_patterns(conn)?
            .iter()
            .map(Pattern::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        if replayed != stored {
            tracing::warn!(
                replayed = replayed.len(),
                stored = stored.len(),
                "delta log replay diverges from pattern table"
            );
        }
        Ok(replayed == stored)
    })
}
