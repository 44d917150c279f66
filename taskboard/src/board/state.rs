//! Board state owned by the store, and the read-only snapshot handed to the
//! presentation layer.

use taskboard_proto::task::{Task, TaskId, TaskStatus};

use super::history::{MoveHistory, MoveRecord};

/// Authoritative local view: tasks in insertion order, the move history,
/// the loading flag and the last user-facing error.
#[derive(Debug, Default)]
pub struct BoardState {
    tasks: Vec<Task>,
    pub(crate) history: MoveHistory,
    pub(crate) loading: bool,
    pub(crate) last_error: Option<String>,
}

impl BoardState {
    /// Creates an empty state with the given history capacity.
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: MoveHistory::new(history_capacity),
            ..Self::default()
        }
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Looks up a task by id for mutation.
    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    /// Inserts a task, or replaces the one with the same id in place.
    pub fn upsert(&mut self, task: Task) {
        match self.task_mut(&task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    /// Removes a task, returning it if it was present.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| &t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    /// Replaces the whole task set. Later duplicates of an id are dropped.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        for task in tasks {
            if self.task(&task.id).is_none() {
                self.tasks.push(task);
            }
        }
    }

    /// All tasks in insertion order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Copies the current state for readers.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            tasks: self.tasks.clone(),
            loading: self.loading,
            last_error: self.last_error.clone(),
            last_move: self.history.top().cloned(),
            history_len: self.history.len(),
        }
    }
}

/// Point-in-time copy of the board for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    /// Tasks in insertion order.
    pub tasks: Vec<Task>,
    /// Whether a full load is in progress.
    pub loading: bool,
    /// Last user-facing error, until cleared.
    pub last_error: Option<String>,
    /// The move `undo` would revert, if any.
    pub last_move: Option<MoveRecord>,
    /// Number of retained history entries.
    pub history_len: usize,
}

impl BoardSnapshot {
    /// Tasks of one column in display order: highest priority first, then
    /// oldest first.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.status == status).collect();
        tasks.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Number of tasks per column, in column order.
    #[must_use]
    pub fn column_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for task in &self.tasks {
            counts[task.status.column()] += 1;
        }
        counts
    }
}
