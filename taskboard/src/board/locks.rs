//! Per-task serialization of remote mutations.
//!
//! Each task id maps to an async mutex. A mutation holds its task's lock from
//! reading the pre-operation state until its remote call (including retries)
//! has settled and any rollback is applied, so two operations on the same
//! task never interleave. Operations on different tasks run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use taskboard_proto::task::TaskId;
use tokio::sync::OwnedMutexGuard;

/// Registry of per-task async locks.
#[derive(Debug, Default)]
pub struct TaskLocks {
    locks: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TaskLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`. Access is released when the
    /// returned guard is dropped.
    pub async fn acquire(&self, id: &TaskId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Entries nobody holds or waits on are no longer needed.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of tasks with a held or awaited lock.
    #[must_use]
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
