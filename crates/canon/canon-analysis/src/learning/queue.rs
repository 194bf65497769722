//! Per-project change queue: priority by trigger, coalescing by path.
//!
//! A change that arrives for a path already pending replaces the pending
//! entry instead of queuing a second merge of the same file. The merged entry
//! keeps the higher trigger and its original queue position.

use canon_core::types::{normalize_path, ChangeKind, FileChange, FxHashMap, Trigger};

#[derive(Debug, Clone)]
struct Pending {
    change: FileChange,
    trigger: Trigger,
    seq: u64,
}

/// One drained batch: all changes share the trigger class they were drained under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedBatch {
    pub trigger: Trigger,
    pub changes: Vec<FileChange>,
    /// Last revision carried by any change in the batch.
    pub revision: Option<String>,
}

#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: FxHashMap<String, Pending>,
    next_seq: u64,
    superseded: u64,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Changes replaced by a later change to the same path before they ran.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Queue a change, coalescing with whatever is pending for the same path.
    pub fn push(&mut self, mut change: FileChange, trigger: Trigger) {
        change.path = normalize_path(&change.path);
        if let Some(prev) = change.previous_path.as_mut() {
            *prev = normalize_path(prev);
        }

        if change.kind == ChangeKind::Renamed {
            if let Some(from) = change.previous_path.clone() {
                if self.push_rename_of_pending(&from, &change, trigger) {
                    return;
                }
            }
        }

        match self.pending.remove(&change.path) {
            Some(existing) => {
                self.superseded += 1;
                let trigger = existing.trigger.max(trigger);
                if existing.change.kind == ChangeKind::Renamed && change.kind.needs_extraction() {
                    // Renamed then edited: drop the old path, re-extract the new one.
                    if let Some(from) = existing.change.previous_path {
                        self.insert_if_absent(FileChange::deleted(from), trigger, existing.seq);
                    }
                    let mut modified = FileChange::modified(change.path.clone());
                    modified.revision = change.revision.or(existing.change.revision);
                    self.insert(modified, trigger, existing.seq);
                } else {
                    self.insert(change, trigger, existing.seq);
                }
            }
            None => {
                let seq = self.bump_seq();
                self.insert(change, trigger, seq);
            }
        }
    }

    /// A rename whose source path still has an unmerged edit cannot simply
    /// re-key rows: the stored rows are stale. Replace both with a delete of
    /// the old path and an add of the new one.
    fn push_rename_of_pending(&mut self, from: &str, change: &FileChange, trigger: Trigger) -> bool {
        let needs_rewrite = self
            .pending
            .get(from)
            .is_some_and(|p| p.change.kind.needs_extraction());
        if !needs_rewrite {
            return false;
        }
        let Some(existing) = self.pending.remove(from) else {
            return false;
        };
        self.superseded += 1;
        let trigger = existing.trigger.max(trigger);
        self.insert(FileChange::deleted(from), trigger, existing.seq);

        let mut added = FileChange::added(change.path.clone());
        added.revision = change.revision.clone();
        let seq = match self.pending.remove(&change.path) {
            Some(target) => {
                self.superseded += 1;
                target.seq
            }
            None => self.bump_seq(),
        };
        self.insert(added, trigger, seq);
        true
    }

    /// Remove and return the oldest pending changes of the highest trigger
    /// class, at most `max` of them.
    pub fn drain_batch(&mut self, max: usize) -> Option<DrainedBatch> {
        let trigger = self.pending.values().map(|p| p.trigger).max()?;
        let mut selected: Vec<(u64, String)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.trigger == trigger)
            .map(|(path, p)| (p.seq, path.clone()))
            .collect();
        selected.sort();
        selected.truncate(max.max(1));

        let mut changes = Vec::with_capacity(selected.len());
        let mut revision = None;
        for (_, path) in selected {
            if let Some(p) = self.pending.remove(&path) {
                if p.change.revision.is_some() {
                    revision = p.change.revision.clone();
                }
                changes.push(p.change);
            }
        }
        Some(DrainedBatch {
            trigger,
            changes,
            revision,
        })
    }

    /// Drop everything pending. Returns how many changes were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.superseded += dropped as u64;
        dropped
    }

    fn insert(&mut self, change: FileChange, trigger: Trigger, seq: u64) {
        self.pending.insert(
            change.path.clone(),
            Pending {
                change,
                trigger,
                seq,
            },
        );
    }

    fn insert_if_absent(&mut self, change: FileChange, trigger: Trigger, seq: u64) {
        if !self.pending.contains_key(&change.path) {
            self.insert(change, trigger, seq);
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(batch: &DrainedBatch) -> Vec<&str> {
        batch.changes.iter().map(|c| c.path.as_str()).collect()
    }

    #[test]
    fn changes_to_same_path_coalesce() {
        let mut queue = ChangeQueue::new();
        queue.push(FileChange::added("src/a.ts"), Trigger::Watch);
        queue.push(FileChange::modified("src/a.ts"), Trigger::Watch);
        queue.push(FileChange::modified("./src/a.ts"), Trigger::Watch);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.superseded(), 2);
        let batch = queue.drain_batch(10).unwrap();
        assert_eq!(batch.changes, vec![FileChange::modified("src/a.ts")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn highest_trigger_drains_first() {
        let mut queue = ChangeQueue::new();
        queue.push(FileChange::modified("a.ts"), Trigger::Watch);
        queue.push(FileChange::modified("b.ts"), Trigger::Manual);
        queue.push(FileChange::modified("c.ts"), Trigger::GitCommit);
        queue.push(FileChange::modified("d.ts"), Trigger::Manual);

        let first = queue.drain_batch(10).unwrap();
        assert_eq!(first.trigger, Trigger::Manual);
        assert_eq!(paths(&first), vec!["b.ts", "d.ts"]);
        assert_eq!(queue.drain_batch(10).unwrap().trigger, Trigger::GitCommit);
        assert_eq!(queue.drain_batch(10).unwrap().trigger, Trigger::Watch);
        assert!(queue.drain_batch(10).is_none());
    }

    #[test]
    fn coalesced_entry_keeps_higher_trigger_and_position() {
        let mut queue = ChangeQueue::new();
        queue.push(FileChange::modified("a.ts"), Trigger::Manual);
        queue.push(FileChange::modified("b.ts"), Trigger::Watch);
        queue.push(FileChange::modified("b.ts"), Trigger::Manual);

        let batch = queue.drain_batch(10).unwrap();
        assert_eq!(paths(&batch), vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn batch_size_is_bounded() {
        let mut queue = ChangeQueue::new();
        for i in 0..5 {
            queue.push(FileChange::modified(format!("f{i}.ts")), Trigger::Watch);
        }
        assert_eq!(queue.drain_batch(2).unwrap().changes.len(), 2);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn rename_then_edit_becomes_delete_and_modify() {
        let mut queue = ChangeQueue::new();
        queue.push(FileChange::renamed("old.ts", "new.ts"), Trigger::Watch);
        queue.push(FileChange::modified("new.ts"), Trigger::Watch);

        let batch = queue.drain_batch(10).unwrap();
        let mut changes = batch.changes;
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            changes,
            vec![FileChange::modified("new.ts"), FileChange::deleted("old.ts")]
        );
    }

    #[test]
    fn rename_of_pending_edit_becomes_delete_and_add() {
        let mut queue = ChangeQueue::new();
        queue.push(FileChange::modified("old.ts"), Trigger::GitCommit);
        queue.push(FileChange::renamed("old.ts", "new.ts"), Trigger::Watch);

        let batch = queue.drain_batch(10).unwrap();
        assert_eq!(batch.trigger, Trigger::GitCommit);
        let mut changes = batch.changes;
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            changes,
            vec![FileChange::added("new.ts"), FileChange::deleted("old.ts")]
        );
    }

    #[test]
    fn drained_batch_carries_last_revision() {
        let mut queue = ChangeQueue::new();
        queue.push(FileChange::modified("a.ts").with_revision("r1"), Trigger::GitCommit);
        queue.push(FileChange::modified("b.ts").with_revision("r2"), Trigger::GitCommit);
        let batch = queue.drain_batch(10).unwrap();
        assert_eq!(batch.revision.as_deref(), Some("r2"));
    }
}
