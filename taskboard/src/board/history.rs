//! Bounded log of reversible status transitions.
//!
//! A move is pushed as pending when it is applied locally and becomes
//! undoable once [`MoveHistory::commit`] confirms it. Only committed entries
//! count against `capacity`, and committing evicts the oldest committed
//! entries beyond it, so a move still in flight never displaces one that
//! is being offered for undo. The default capacity of one makes it a
//! single-slot undo.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use taskboard_proto::task::{TaskId, TaskStatus};

/// Default number of retained committed moves.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1;

/// One status transition that can be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Store-unique sequence number, used to match an entry to the move
    /// that pushed it.
    pub seq: u64,
    /// Task that moved (a reference, the record does not own the task).
    pub task_id: TaskId,
    /// Status before the move.
    pub from: TaskStatus,
    /// Status after the move.
    pub to: TaskStatus,
    /// When the move was applied locally.
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    record: MoveRecord,
    committed: bool,
}

/// Bounded stack of [`MoveRecord`]s.
#[derive(Debug)]
pub struct MoveHistory {
    entries: VecDeque<Entry>,
    capacity: usize,
    next_seq: u64,
}

impl Default for MoveHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MoveHistory {
    /// Creates an empty history keeping at most `capacity` committed
    /// entries (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_seq: 1,
        }
    }

    /// Records a pending move and returns the new entry.
    pub fn push(&mut self, task_id: TaskId, from: TaskStatus, to: TaskStatus) -> MoveRecord {
        let record = MoveRecord {
            seq: self.next_seq,
            task_id,
            from,
            to,
            at: Utc::now(),
        };
        self.next_seq += 1;
        self.entries.push_back(Entry {
            record: record.clone(),
            committed: false,
        });
        record
    }

    /// Marks move `seq` as confirmed, making it undoable, and evicts the
    /// oldest committed entries beyond capacity. Returns `false` if the
    /// entry is gone.
    pub fn commit(&mut self, seq: u64) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.record.seq == seq) else {
            return false;
        };
        entry.committed = true;
        while self.entries.iter().filter(|e| e.committed).count() > self.capacity {
            if let Some(idx) = self.entries.iter().position(|e| e.committed) {
                self.entries.remove(idx);
            }
        }
        true
    }

    /// Whether move `seq` is retained and confirmed.
    #[must_use]
    pub fn is_committed(&self, seq: u64) -> bool {
        self.entries
            .iter()
            .any(|e| e.record.seq == seq && e.committed)
    }

    /// The most recent committed entry, which undo would revert.
    #[must_use]
    pub fn top(&self) -> Option<&MoveRecord> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.committed)
            .map(|e| &e.record)
    }

    /// Removes and returns committed entry `seq`. Pending entries are left
    /// alone.
    pub fn take_committed(&mut self, seq: u64) -> Option<MoveRecord> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.record.seq == seq && e.committed)?;
        self.entries.remove(idx).map(|e| e.record)
    }

    /// Removes the entry with sequence number `seq`, pending or not.
    pub fn remove(&mut self, seq: u64) -> Option<MoveRecord> {
        let idx = self.entries.iter().position(|e| e.record.seq == seq)?;
        self.entries.remove(idx).map(|e| e.record)
    }

    /// Drops every entry that refers to `task_id`.
    pub fn forget_task(&mut self, task_id: &TaskId) {
        self.entries.retain(|e| &e.record.task_id != task_id);
    }

    /// Number of retained entries, pending ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entry is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained committed entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from oldest to newest, pending ones included.
    pub fn iter(&self) -> impl Iterator<Item = &MoveRecord> {
        self.entries.iter().map(|e| &e.record)
    }
}
