//! In-process task service for testing and offline mode.
//!
//! [`InMemoryTaskService`] keeps tasks in a `Vec` and behaves like the HTTP
//! service, including validation and 404s. Failures and latency can be
//! scripted so tests can exercise retry exhaustion and rollback without a
//! network.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use taskboard_proto::task::{NewTask, Task, TaskId, TaskPatch};

use super::{RemoteError, TaskService};

/// One call received by an [`InMemoryTaskService`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `list()`
    List,
    /// `create(new)`
    Create(NewTask),
    /// `update(id, patch)`
    Update(TaskId, TaskPatch),
    /// `delete(id)`
    Delete(TaskId),
}

#[derive(Debug, Default)]
struct FailurePlan {
    /// Errors returned by the next calls, one per call.
    queued: VecDeque<RemoteError>,
    /// Error returned by every call once the queue is empty.
    always: Option<RemoteError>,
}

impl FailurePlan {
    fn next_failure(&mut self) -> Option<RemoteError> {
        self.queued.pop_front().or_else(|| self.always.clone())
    }
}

/// Number of calls kept by [`InMemoryTaskService::calls`].
pub const CALL_LOG_CAPACITY: usize = 256;

/// Recent calls plus a running total.
#[derive(Debug, Default)]
struct CallLog {
    recent: VecDeque<RemoteCall>,
    total: usize,
}

impl CallLog {
    fn record(&mut self, call: RemoteCall) {
        if self.recent.len() == CALL_LOG_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(call);
        self.total += 1;
    }
}

/// In-memory [`TaskService`] with scriptable failures.
///
/// Failed calls have no side effects. Every call is counted, including
/// failed ones, so tests can assert how many attempts were made; only the
/// most recent [`CALL_LOG_CAPACITY`] are kept.
#[derive(Debug, Default)]
pub struct InMemoryTaskService {
    tasks: Mutex<Vec<Task>>,
    plan: Mutex<FailurePlan>,
    latency: Mutex<Duration>,
    calls: Mutex<CallLog>,
}

impl InMemoryTaskService {
    /// Creates an empty, always-healthy service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service pre-populated with `tasks`.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    /// The next `count` calls fail with `error`.
    pub fn fail_next(&self, count: usize, error: &RemoteError) {
        let mut plan = self.plan.lock();
        plan.queued.extend(std::iter::repeat_n(error.clone(), count));
    }

    /// Every call fails with `error` until [`recover`](Self::recover).
    pub fn fail_always(&self, error: RemoteError) {
        self.plan.lock().always = Some(error);
    }

    /// Clears all scripted failures.
    pub fn recover(&self) {
        let mut plan = self.plan.lock();
        plan.queued.clear();
        plan.always = None;
    }

    /// Every call sleeps for `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Current server-side tasks, in insertion order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Server-side copy of a single task.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().iter().find(|t| &t.id == id).cloned()
    }

    /// The most recent calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().recent.iter().cloned().collect()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().total
    }

    /// Records the call, waits out the latency, then applies the failure plan.
    async fn begin(&self, call: RemoteCall) -> Result<(), RemoteError> {
        self.calls.lock().record(call);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.plan.lock().next_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn rejected(e: &impl std::fmt::Display) -> RemoteError {
    RemoteError::Rejected {
        status: 422,
        message: e.to_string(),
    }
}

impl TaskService for InMemoryTaskService {
    async fn list(&self) -> Result<Vec<Task>, RemoteError> {
        self.begin(RemoteCall::List).await?;
        Ok(self.tasks())
    }

    async fn create(&self, new: &NewTask) -> Result<Task, RemoteError> {
        self.begin(RemoteCall::Create(new.clone())).await?;
        new.validate().map_err(|e| rejected(&e))?;
        let task = Task::from_new(new.clone());
        self.tasks.lock().push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        self.begin(RemoteCall::Update(id.clone(), patch.clone()))
            .await?;
        patch.validate().map_err(|e| rejected(&e))?;
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RemoteError> {
        self.begin(RemoteCall::Delete(id.clone())).await?;
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Err(RemoteError::NotFound(id.clone()));
        }
        Ok(())
    }
}
