//! Timed undo affordance shown after a committed move.
//!
//! The prompt ends either by expiry or by an explicit undo, never both.
//! On expiry the owner calls [`TaskStore::expire_move`](super::TaskStore::expire_move)
//! so the history entry stops being undoable.

use std::time::{Duration, Instant};

use super::history::MoveRecord;

/// Default time the undo affordance stays visible.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

/// An undo offer for one committed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoPrompt {
    /// The move that can be undone.
    pub record: MoveRecord,
    deadline: Instant,
}

impl UndoPrompt {
    /// Opens a prompt for `record` that lasts `window` from `now`.
    #[must_use]
    pub fn new(record: MoveRecord, window: Duration, now: Instant) -> Self {
        Self {
            record,
            deadline: now + window,
        }
    }

    /// Instant at which the prompt lapses.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns `true` once the window has lapsed.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Time left before expiry (zero once expired).
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}
