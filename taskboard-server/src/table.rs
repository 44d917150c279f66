//! In-memory task table.
//!
//! Tasks keep insertion order. The service assigns ids and creation
//! timestamps; clients never choose them.

use taskboard_proto::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus, ValidationError};
use tokio::sync::RwLock;

/// Thread-safe task storage behind a [`RwLock`].
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: RwLock<Vec<Task>>,
}

impl TaskTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding a few demo tasks spread over all columns.
    #[must_use]
    pub fn seeded() -> Self {
        let demo = [
            ("Sketch the board layout", Priority::Medium, TaskStatus::Done),
            ("Wire the REST client", Priority::High, TaskStatus::InProgress),
            ("Add undo for card moves", Priority::High, TaskStatus::Todo),
            ("Write the README", Priority::Low, TaskStatus::Todo),
        ];
        let tasks = demo
            .into_iter()
            .map(|(title, priority, status)| {
                let mut task = Task::from_new(NewTask::titled(title).with_priority(priority));
                task.status = status;
                task
            })
            .collect();
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// All tasks in insertion order.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Returns `true` if no tasks are stored.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Looks up one task.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| &t.id == id).cloned()
    }

    /// Validates and stores a new task in the `Todo` column.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] if the payload is invalid.
    pub async fn create(&self, new: NewTask) -> Result<Task, ValidationError> {
        new.validate()?;
        let task = Task::from_new(new);
        self.tasks.write().await.push(task.clone());
        tracing::debug!(task_id = %task.id, "task stored");
        Ok(task)
    }

    /// Applies a partial update. Returns `Ok(None)` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] if the patch is empty or invalid.
    pub async fn update(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, ValidationError> {
        patch.validate()?;
        let mut tasks = self.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| &t.id == id).map(|task| {
            patch.apply_to(task);
            task.clone()
        }))
    }

    /// Removes a task. Returns `false` for an unknown id.
    pub async fn delete(&self, id: &TaskId) -> bool {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        tasks.len() != before
    }
}
