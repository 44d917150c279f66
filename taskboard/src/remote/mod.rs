//! Remote task service abstraction.
//!
//! Defines the [`TaskService`] trait the board synchronizes against.
//! Concrete implementations include:
//! - [`http::HttpTaskService`] - REST client for the task service
//! - [`memory::InMemoryTaskService`] - in-process service with scriptable
//!   failures, for tests and offline mode

pub mod http;
pub mod memory;

use taskboard_proto::task::{NewTask, Task, TaskId, TaskPatch};

/// Errors reported by a [`TaskService`] call.
///
/// Failures are classified at the boundary so the retry loop can tell
/// transient faults from requests that will never succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service could not be reached (connect or transport failure).
    #[error("task service unreachable: {0}")]
    Unreachable(String),

    /// A single attempt exceeded its time bound.
    #[error("task service request timed out")]
    Timeout,

    /// The service answered with a 5xx status.
    #[error("task service error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },

    /// The task does not exist on the service.
    #[error("task {0} not found on the service")]
    NotFound(TaskId),

    /// The service refused the request (4xx other than 404).
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response from task service: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether another attempt could succeed.
    ///
    /// Only transport faults, timeouts and server errors are retried;
    /// client errors and malformed responses fail immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Timeout | Self::Server { .. }
        )
    }

    /// Maps an HTTP error status and message to the matching variant.
    #[must_use]
    pub fn from_status(status: u16, message: String, task: Option<&TaskId>) -> Self {
        match (status, task) {
            (404, Some(id)) => Self::NotFound(id.clone()),
            (500..=599, _) => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }
}

/// Async task service contract the board depends on.
///
/// Every call may fail at any time with a [`RemoteError`]. Implementations
/// do not retry; retry and timeouts are applied by the caller through
/// [`crate::retry::with_retry`].
pub trait TaskService: Send + Sync {
    /// Fetches every task.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Task>, RemoteError>> + Send;

    /// Creates a task. The service assigns id, `Todo` status and creation
    /// time, and returns the stored representation.
    fn create(
        &self,
        new: &NewTask,
    ) -> impl std::future::Future<Output = Result<Task, RemoteError>> + Send;

    /// Applies a partial update and returns the updated task.
    fn update(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<Task, RemoteError>> + Send;

    /// Deletes a task.
    fn delete(&self, id: &TaskId)
    -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;
}
