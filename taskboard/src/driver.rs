//! Bridges the synchronous TUI event loop to the async [`TaskStore`].
//!
//! ```text
//! TUI (main thread)  ──── BoardCommand ───→  command loop (tokio)
//!                    ←──── BoardEvent ─────  TaskStore
//! ```
//!
//! The main thread sends [`BoardCommand`]s and drains [`BoardEvent`]s on
//! each tick. Every remote-backed command runs in its own tokio task so a
//! slow call never blocks the next keypress; the store's per-task locks
//! keep operations on the same task in order.

use std::sync::Arc;

use taskboard_proto::task::{NewTask, TaskId, TaskPatch, TaskStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::board::TaskStore;
use crate::remote::TaskService;

/// Default capacity of the command channel.
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Commands sent from the TUI to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    /// Reload every task from the service.
    Load,
    /// Create a task.
    Create(NewTask),
    /// Move a task to a specific column.
    UpdateStatus {
        /// Task to move.
        id: TaskId,
        /// Target column.
        status: TaskStatus,
    },
    /// Move a task one column right.
    MoveNext(TaskId),
    /// Move a task one column left.
    MovePrevious(TaskId),
    /// Edit title, description or priority.
    UpdateFields {
        /// Task to edit.
        id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Delete a task.
    Delete(TaskId),
    /// Revert move `seq`, the one the open undo offer belongs to.
    Undo(u64),
    /// The undo prompt for move `seq` lapsed.
    ExpireMove(u64),
    /// Stop accepting commands.
    Shutdown,
}

/// Spawns the command loop and returns its sender and join handle.
///
/// Failures are not reported back on this channel; the store records them
/// as its last error and emits a [`BoardEvent`](crate::board::BoardEvent).
pub fn spawn_driver<S>(
    store: Arc<TaskStore<S>>,
    capacity: usize,
) -> (mpsc::Sender<BoardCommand>, JoinHandle<()>)
where
    S: TaskService + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(command_loop(store, cmd_rx));
    (cmd_tx, handle)
}

async fn command_loop<S>(store: Arc<TaskStore<S>>, mut cmd_rx: mpsc::Receiver<BoardCommand>)
where
    S: TaskService + 'static,
{
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            BoardCommand::Shutdown => {
                tracing::info!("board command loop shutting down");
                break;
            }
            BoardCommand::ExpireMove(seq) => {
                store.expire_move(seq);
            }
            cmd => {
                tracing::debug!(?cmd, "dispatching board command");
                let store = Arc::clone(&store);
                tokio::spawn(async move { execute(&store, cmd).await });
            }
        }
    }
}

/// Runs one command against the store. Errors are already recorded by the
/// store, so they are only logged here.
async fn execute<S: TaskService>(store: &TaskStore<S>, cmd: BoardCommand) {
    let result = match cmd {
        BoardCommand::Load => store.load().await.map(drop),
        BoardCommand::Create(new) => store.create(new).await.map(drop),
        BoardCommand::UpdateStatus { id, status } => {
            store.update_status(&id, status).await.map(drop)
        }
        BoardCommand::MoveNext(id) => store.shift(&id, true).await.map(drop),
        BoardCommand::MovePrevious(id) => store.shift(&id, false).await.map(drop),
        BoardCommand::UpdateFields { id, patch } => {
            store.update_fields(&id, patch).await.map(drop)
        }
        BoardCommand::Delete(id) => store.delete(&id).await.map(drop),
        BoardCommand::Undo(seq) => {
            store.undo_move(seq).await;
            Ok(())
        }
        BoardCommand::ExpireMove(seq) => {
            store.expire_move(seq);
            Ok(())
        }
        BoardCommand::Shutdown => Ok(()),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "board command failed");
    }
}
