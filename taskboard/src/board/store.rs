//! The task store: optimistic moves, pessimistic edits, rollback and undo.
//!
//! Every operation reads and writes [`BoardState`] under a synchronous
//! mutex that is never held across an await, so readers never observe a
//! half-applied mutation. Remote calls go through [`with_retry`]; mutations
//! of a single task are serialized by [`TaskLocks`].

use taskboard_proto::task::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use tokio::sync::mpsc;

use parking_lot::Mutex;

use super::history::MoveRecord;
use super::locks::TaskLocks;
use super::state::{BoardSnapshot, BoardState};
use super::{BoardEvent, Operation, StoreConfig, StoreError};
use crate::remote::{RemoteError, TaskService};
use crate::retry::{RetryPolicy, with_retry};

/// Owns the board state and routes every mutation to the task service.
///
/// Share it behind an `Arc`; all operations take `&self`, so several can be
/// in flight at once.
pub struct TaskStore<S: TaskService> {
    /// Remote task service.
    service: S,
    /// Retry policy for remote calls.
    policy: RetryPolicy,
    /// Local authoritative state.
    state: Mutex<BoardState>,
    /// Per-task mutation locks.
    locks: TaskLocks,
    /// Channel for notifying the presentation layer.
    event_tx: mpsc::Sender<BoardEvent>,
}

impl<S: TaskService> TaskStore<S> {
    /// Creates an empty store backed by `service`.
    ///
    /// Returns the store and a receiver for [`BoardEvent`]s that the
    /// presentation layer should consume.
    pub fn new(service: S, config: &StoreConfig) -> (Self, mpsc::Receiver<BoardEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let store = Self {
            service,
            policy: config.retry.clone(),
            state: Mutex::new(BoardState::new(config.history_capacity)),
            locks: TaskLocks::new(),
            event_tx,
        };
        (store, event_rx)
    }

    /// The remote service this store synchronizes with.
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Copy of the current board state.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        self.state.lock().snapshot()
    }

    /// Local copy of one task.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().task(id).cloned()
    }

    /// Last user-facing error, if not cleared.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Clears the last error.
    pub fn clear_error(&self) {
        let cleared = self.state.lock().last_error.take().is_some();
        if cleared {
            self.emit(BoardEvent::Changed);
        }
    }

    /// Moves that can still be undone, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<MoveRecord> {
        self.state.lock().history.iter().cloned().collect()
    }

    fn emit(&self, event: BoardEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(BoardEvent::Changed)) => {
                tracing::trace!("change notification dropped, receiver full");
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(?event, "board event dropped, receiver full");
            }
        }
    }

    /// Records a failure as the last error and announces it.
    fn fail(&self, err: StoreError) -> StoreError {
        let message = err.user_message();
        tracing::warn!(error = %err, "board operation failed");
        self.state.lock().last_error = Some(message.clone());
        self.emit(BoardEvent::Failed(message));
        err
    }

    /// Replaces the local task set with the service's.
    ///
    /// On failure the previous set is kept and the error is stored. The
    /// loading flag is cleared either way.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the list call fails.
    pub async fn load(&self) -> Result<usize, StoreError> {
        self.state.lock().loading = true;
        self.emit(BoardEvent::Changed);

        let result = with_retry(&self.policy, "list", || self.service.list()).await;

        let outcome = {
            let mut state = self.state.lock();
            state.loading = false;
            match result {
                Ok(tasks) => {
                    let count = tasks.len();
                    state.replace_tasks(tasks);
                    state.last_error = None;
                    Ok(count)
                }
                Err(source) => Err(StoreError::remote(Operation::Load, source)),
            }
        };
        self.emit(BoardEvent::Changed);

        match outcome {
            Ok(count) => {
                tracing::info!(count, "tasks loaded");
                Ok(count)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Creates a task once the service has confirmed it.
    ///
    /// Nothing is added locally until the service answers, so a failed
    /// create leaves the board untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] without contacting the service if
    /// the payload is invalid, or [`StoreError::Remote`] if the create fails.
    pub async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        if let Err(e) = new.validate() {
            return Err(self.fail(e.into()));
        }

        let payload = &new;
        let task = match with_retry(&self.policy, "create", move || {
            self.service.create(payload)
        })
        .await
        {
            Ok(task) => task,
            Err(source) => return Err(self.fail(StoreError::remote(Operation::Create, source))),
        };

        self.state.lock().upsert(task.clone());
        self.emit(BoardEvent::Changed);
        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Moves a task to `status`, optimistically.
    ///
    /// The new status and a history entry are applied before the remote
    /// call. If the call fails, the status is reverted and that entry is
    /// removed. Returns `Ok(None)` without any remote call if the task is
    /// unknown or already has `status`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] after rolling back if the update
    /// fails. The move must not be offered for undo in that case.
    pub async fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Option<MoveRecord>, StoreError> {
        let _guard = self.locks.acquire(id).await;

        let record = {
            let mut state = self.state.lock();
            let Some(task) = state.task_mut(id) else {
                tracing::debug!(task_id = %id, "move ignored, task not found");
                return Ok(None);
            };
            let from = task.status;
            if from == status {
                return Ok(None);
            }
            task.status = status;
            state.history.push(id.clone(), from, status)
        };
        self.emit(BoardEvent::Changed);

        let patch = TaskPatch::status(status);
        let patch = &patch;
        let result = with_retry(&self.policy, "update_status", move || {
            self.service.update(id, patch)
        })
        .await;

        match result {
            Ok(remote) => {
                let committed = {
                    let mut state = self.state.lock();
                    state.upsert(remote);
                    state.history.commit(record.seq)
                };
                tracing::info!(
                    task_id = %id,
                    from = %record.from,
                    to = %record.to,
                    "task moved"
                );
                self.emit(BoardEvent::Changed);
                // A move whose undo offer cannot be shown must not stay undoable.
                if committed
                    && matches!(
                        self.event_tx
                            .try_send(BoardEvent::MoveCommitted(record.clone())),
                        Err(mpsc::error::TrySendError::Full(_))
                    )
                {
                    tracing::warn!(seq = record.seq, "undo offer dropped, receiver full");
                    self.state.lock().history.remove(record.seq);
                }
                Ok(Some(record))
            }
            Err(source) => {
                {
                    let mut state = self.state.lock();
                    if let Some(task) = state.task_mut(id) {
                        task.status = record.from;
                    }
                    state.history.remove(record.seq);
                }
                tracing::info!(task_id = %id, to = %record.to, "move rolled back");
                self.emit(BoardEvent::Changed);
                self.emit(BoardEvent::MoveReverted(record));
                Err(self.fail(StoreError::remote(Operation::Move, source)))
            }
        }
    }

    /// Moves a task one column to the right or left. Returns `Ok(None)` at
    /// the board edge.
    ///
    /// # Errors
    ///
    /// See [`update_status`](Self::update_status).
    pub async fn shift(&self, id: &TaskId, forward: bool) -> Result<Option<MoveRecord>, StoreError> {
        let Some(current) = self.task(id).map(|t| t.status) else {
            return Ok(None);
        };
        let target = if forward {
            current.next()
        } else {
            current.previous()
        };
        self.update_status(id, target).await
    }

    /// Edits title, description or priority, pessimistically.
    ///
    /// The service is called first and the patch is applied locally only
    /// on success. A status in `patch` is ignored; status changes go
    /// through [`update_status`](Self::update_status). Returns `Ok(None)` if
    /// the task is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an empty or invalid patch, or
    /// [`StoreError::Remote`] if the update fails. Local state is unchanged
    /// in both cases.
    pub async fn update_fields(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let patch = TaskPatch {
            status: None,
            ..patch
        };
        if let Err(e) = patch.validate() {
            return Err(self.fail(e.into()));
        }

        let _guard = self.locks.acquire(id).await;
        if self.task(id).is_none() {
            return Ok(None);
        }

        let payload = &patch;
        if let Err(source) = with_retry(&self.policy, "update_fields", move || {
            self.service.update(id, payload)
        })
        .await
        {
            return Err(self.fail(StoreError::remote(Operation::Update, source)));
        }

        let updated = {
            let mut state = self.state.lock();
            state.task_mut(id).map(|task| {
                patch.apply_to(task);
                task.clone()
            })
        };
        self.emit(BoardEvent::Changed);
        tracing::info!(task_id = %id, "task updated");
        Ok(updated)
    }

    /// Deletes a task after the service confirms. A task the service no
    /// longer knows is treated as deleted. Returns `Ok(false)` if the task
    /// is not on the board.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the delete fails; the task stays
    /// on the board.
    pub async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        let _guard = self.locks.acquire(id).await;
        if self.task(id).is_none() {
            return Ok(false);
        }

        match with_retry(&self.policy, "delete", || self.service.delete(id)).await {
            Ok(()) => {}
            Err(RemoteError::NotFound(_)) => {
                tracing::debug!(task_id = %id, "task already gone on the service");
            }
            Err(source) => return Err(self.fail(StoreError::remote(Operation::Delete, source))),
        }

        {
            let mut state = self.state.lock();
            state.remove(id);
            state.history.forget_task(id);
        }
        self.emit(BoardEvent::Changed);
        tracing::info!(task_id = %id, "task deleted");
        Ok(true)
    }

    /// Reverts the most recent confirmed move.
    ///
    /// Moves still waiting for the service are never undone. The entry is
    /// consumed: undoing never creates a new undoable entry, and calling
    /// this again reverts the next entry if there is one.
    ///
    /// Returns the undone move, or `None` if there was nothing to undo (no
    /// remote call is made then).
    pub async fn undo_last_move(&self) -> Option<MoveRecord> {
        let seq = self.state.lock().history.top()?.seq;
        self.undo_move(seq).await
    }

    /// Reverts confirmed move `seq`, the one an undo offer was shown for.
    ///
    /// The task's previous status is applied locally first, then persisted
    /// remotely. A remote failure is reported through the last error and
    /// [`BoardEvent::UndoSyncFailed`] but never re-reverts local state.
    ///
    /// Returns `None` without any remote call if the entry was already
    /// undone, expired or evicted, or if the task has moved since.
    pub async fn undo_move(&self, seq: u64) -> Option<MoveRecord> {
        let task_id = {
            let state = self.state.lock();
            let record = state.history.iter().find(|r| r.seq == seq)?;
            if !state.history.is_committed(seq) {
                tracing::debug!(seq, "undo skipped, move not confirmed");
                return None;
            }
            record.task_id.clone()
        };
        let _guard = self.locks.acquire(&task_id).await;

        let record = {
            let mut state = self.state.lock();
            let Some(record) = state.history.take_committed(seq) else {
                tracing::debug!(seq, "undo skipped, move no longer undoable");
                return None;
            };
            match state.task_mut(&record.task_id) {
                Some(task) if task.status == record.to => task.status = record.from,
                Some(_) => {
                    tracing::debug!(task_id = %record.task_id, seq, "undo skipped, task moved since");
                    return None;
                }
                None => {
                    tracing::debug!(task_id = %record.task_id, "undo skipped, task no longer on the board");
                    return None;
                }
            }
            record
        };
        tracing::info!(
            task_id = %record.task_id,
            from = %record.to,
            to = %record.from,
            "move undone"
        );
        self.emit(BoardEvent::Changed);
        self.emit(BoardEvent::UndoApplied(record.clone()));

        let patch = TaskPatch::status(record.from);
        let patch = &patch;
        let task_id = &record.task_id;
        if let Err(source) = with_retry(&self.policy, "undo", move || {
            self.service.update(task_id, patch)
        })
        .await
        {
            let err = StoreError::remote(Operation::UndoSync, source);
            let message = err.user_message();
            tracing::warn!(error = %err, "undo not saved remotely, keeping local undo");
            self.state.lock().last_error = Some(message.clone());
            self.emit(BoardEvent::UndoSyncFailed {
                record: record.clone(),
                message,
            });
        }
        Some(record)
    }

    /// Ends the undo window for move `seq` by dropping its history entry.
    /// Returns `false` if the entry was already undone, rolled back or
    /// evicted.
    pub fn expire_move(&self, seq: u64) -> bool {
        let removed = self.state.lock().history.remove(seq).is_some();
        if removed {
            tracing::debug!(seq, "undo window expired");
            self.emit(BoardEvent::Changed);
        }
        removed
    }
}
