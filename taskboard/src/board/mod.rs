//! Client-side task state synchronization.
//!
//! The [`TaskStore`] holds the board's tasks, applies optimistic status
//! moves, reconciles every mutation with the remote [`TaskService`] through
//! the retry wrapper, and keeps a bounded [`MoveHistory`] for undo.
//! State changes are announced on a [`BoardEvent`] channel.
//!
//! [`TaskService`]: crate::remote::TaskService

pub mod history;
pub mod locks;
pub mod state;
pub mod store;
pub mod undo;

pub use history::{DEFAULT_HISTORY_CAPACITY, MoveHistory, MoveRecord};
pub use state::{BoardSnapshot, BoardState};
pub use store::TaskStore;
pub use undo::{DEFAULT_UNDO_WINDOW, UndoPrompt};

use taskboard_proto::task::ValidationError;

use crate::remote::RemoteError;
use crate::retry::RetryPolicy;

/// Store operation that talked to the remote service, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fetching the full task set.
    Load,
    /// Creating a task.
    Create,
    /// Editing title, description or priority.
    Update,
    /// Changing a task's status.
    Move,
    /// Deleting a task.
    Delete,
    /// Persisting an undo.
    UndoSync,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load tasks"),
            Self::Create => write!(f, "create task"),
            Self::Update => write!(f, "update task"),
            Self::Move => write!(f, "move task"),
            Self::Delete => write!(f, "delete task"),
            Self::UndoSync => write!(f, "save undo"),
        }
    }
}

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Input rejected locally; no remote call was made.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The remote call failed after the retry budget was spent, or failed
    /// with a non-retryable error.
    #[error("could not {operation}: {source}")]
    Remote {
        /// Which store operation failed.
        operation: Operation,
        /// Final error from the service.
        source: RemoteError,
    },
}

impl StoreError {
    pub(crate) const fn remote(operation: Operation, source: RemoteError) -> Self {
        Self::Remote { operation, source }
    }

    /// Message suitable for display in the board.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => capitalize(&e.to_string()),
            Self::Remote { operation, source } => {
                let reason = match source {
                    RemoteError::Unreachable(_) | RemoteError::Timeout => {
                        "the task service is not responding".to_string()
                    }
                    RemoteError::Server { status, .. } => {
                        format!("the task service failed ({status})")
                    }
                    RemoteError::NotFound(_) => "the task no longer exists".to_string(),
                    RemoteError::Rejected { message, .. } => message.clone(),
                    RemoteError::Decode(_) => {
                        "unexpected response from the task service".to_string()
                    }
                };
                format!("Could not {operation}: {reason}")
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Notifications emitted by the [`TaskStore`] for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// Local state changed; re-read the snapshot.
    Changed,
    /// A move was confirmed by the service and may be offered for undo.
    MoveCommitted(MoveRecord),
    /// A move failed remotely and was rolled back.
    MoveReverted(MoveRecord),
    /// A move was undone locally.
    UndoApplied(MoveRecord),
    /// An undo was applied locally but could not be saved remotely.
    UndoSyncFailed {
        /// The undone move.
        record: MoveRecord,
        /// User-facing description of the failure.
        message: String,
    },
    /// An operation failed; the message is also stored as the last error.
    Failed(String),
}

/// Tunables for a [`TaskStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Retry policy applied to every remote call.
    pub retry: RetryPolicy,
    /// Number of moves kept for undo.
    pub history_capacity: usize,
    /// Capacity of the [`BoardEvent`] channel.
    pub event_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_buffer: 64,
        }
    }
}
