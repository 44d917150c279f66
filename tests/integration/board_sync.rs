//! Integration tests for board synchronization against an in-memory task
//! service: optimistic moves, rollback after exhausted retries, pessimistic
//! edits, and concurrent operations.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use taskboard::board::{BoardEvent, StoreConfig, StoreError, TaskStore};
use taskboard::remote::memory::{InMemoryTaskService, RemoteCall};
use taskboard::remote::{RemoteError, TaskService};
use taskboard::retry::RetryPolicy;
use taskboard_proto::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_config() -> StoreConfig {
    StoreConfig {
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(2),
        },
        ..StoreConfig::default()
    }
}

fn unavailable() -> RemoteError {
    RemoteError::Server {
        status: 503,
        message: "unavailable".into(),
    }
}

async fn loaded_store(
    tasks: Vec<Task>,
    config: &StoreConfig,
) -> (Arc<TaskStore<InMemoryTaskService>>, mpsc::Receiver<BoardEvent>) {
    let (store, events) = TaskStore::new(InMemoryTaskService::with_tasks(tasks), config);
    store.load().await.unwrap();
    (Arc::new(store), events)
}

fn drain(events: &mut mpsc::Receiver<BoardEvent>) -> Vec<BoardEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = events.try_recv() {
        out.push(ev);
    }
    out
}

fn ids(tasks: &[Task]) -> BTreeSet<TaskId> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_then_undo_restores_status_and_empties_history() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, _events) = loaded_store(vec![t.clone()], &fast_config()).await;

    let record = store
        .update_status(&t.id, TaskStatus::InProgress)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::InProgress);
    assert_eq!(store.history(), vec![record.clone()]);
    assert_eq!((record.from, record.to), (TaskStatus::Todo, TaskStatus::InProgress));

    store.undo_last_move().await.unwrap();
    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::Todo);
    assert!(store.history().is_empty());
    assert_eq!(store.service().task(&t.id).unwrap().status, TaskStatus::Todo);
}

#[tokio::test]
async fn exhausted_move_reverts_after_three_attempts() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, mut events) = loaded_store(vec![t.clone()], &fast_config()).await;
    drain(&mut events);
    store.service().fail_always(unavailable());
    let before = store.service().call_count();

    let err = store.update_status(&t.id, TaskStatus::Done).await.unwrap_err();

    assert!(matches!(err, StoreError::Remote { .. }));
    assert_eq!(store.service().call_count() - before, 3);
    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::Todo);
    assert!(store.history().is_empty());
    assert!(store.last_error().is_some());

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, BoardEvent::MoveReverted(_))));
    assert!(!events.iter().any(|e| matches!(e, BoardEvent::MoveCommitted(_))));
}

#[tokio::test]
async fn not_found_is_not_retried_and_rolls_back() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, _events) = loaded_store(vec![t.clone()], &fast_config()).await;
    // The task vanished on the service after the load.
    store.service().delete(&t.id).await.unwrap();
    let before = store.service().call_count();

    let err = store.update_status(&t.id, TaskStatus::Done).await.unwrap_err();

    assert_eq!(store.service().call_count() - before, 1);
    assert_eq!(
        err.user_message(),
        "Could not move task: the task no longer exists"
    );
    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::Todo);
}

#[tokio::test]
async fn successive_moves_end_at_last_status() {
    let t = Task::from_new(NewTask::titled("T"));
    let config = StoreConfig {
        history_capacity: 8,
        ..fast_config()
    };
    let (store, _events) = loaded_store(vec![t.clone()], &config).await;

    let path = [
        TaskStatus::Done,
        TaskStatus::InProgress,
        TaskStatus::Todo,
        TaskStatus::Done,
    ];
    for status in path {
        store.update_status(&t.id, status).await.unwrap();
    }

    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::Done);
    assert_eq!(store.history().len(), path.len());
    assert_eq!(store.service().task(&t.id).unwrap().status, TaskStatus::Done);
}

#[tokio::test]
async fn default_history_keeps_only_latest_move() {
    let a = Task::from_new(NewTask::titled("a"));
    let b = Task::from_new(NewTask::titled("b"));
    let (store, _events) = loaded_store(vec![a.clone(), b.clone()], &fast_config()).await;

    store.update_status(&a.id, TaskStatus::Done).await.unwrap();
    store.update_status(&b.id, TaskStatus::Done).await.unwrap();

    let history = store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].task_id, b.id);

    store.undo_last_move().await.unwrap();
    assert!(store.undo_last_move().await.is_none());
    assert_eq!(store.task(&a.id).unwrap().status, TaskStatus::Done);
    assert_eq!(store.task(&b.id).unwrap().status, TaskStatus::Todo);
}

#[tokio::test]
async fn undo_reverts_confirmed_move_not_the_one_in_flight() {
    let x = Task::from_new(NewTask::titled("x"));
    let y = Task::from_new(NewTask::titled("y"));
    let (store, mut events) = loaded_store(vec![x.clone(), y.clone()], &fast_config()).await;

    let offered = store
        .update_status(&x.id, TaskStatus::Done)
        .await
        .unwrap()
        .unwrap();
    assert!(drain(&mut events).contains(&BoardEvent::MoveCommitted(offered.clone())));

    store.service().set_latency(Duration::from_millis(200));
    let in_flight = {
        let store = Arc::clone(&store);
        let id = y.id.clone();
        tokio::spawn(async move { store.update_status(&id, TaskStatus::InProgress).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.task(&y.id).unwrap().status, TaskStatus::InProgress);
    assert_eq!(store.history().len(), 2);

    let undone = store.undo_last_move().await.unwrap();
    assert_eq!(undone.seq, offered.seq);
    assert_eq!(store.task(&x.id).unwrap().status, TaskStatus::Todo);
    assert_eq!(store.task(&y.id).unwrap().status, TaskStatus::InProgress);

    let y_move = in_flight.await.unwrap().unwrap().unwrap();
    assert_eq!(store.history(), vec![y_move]);
    assert_eq!(store.service().task(&x.id).unwrap().status, TaskStatus::Todo);
    assert_eq!(
        store.service().task(&y.id).unwrap().status,
        TaskStatus::InProgress
    );
}

#[tokio::test]
async fn unconfirmed_move_cannot_be_undone() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, _events) = loaded_store(vec![t.clone()], &fast_config()).await;
    store.service().set_latency(Duration::from_millis(200));

    let in_flight = {
        let store = Arc::clone(&store);
        let id = t.id.clone();
        tokio::spawn(async move { store.update_status(&id, TaskStatus::Done).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let pending = store.history()[0].clone();
    let calls_before = store.service().call_count();

    assert!(store.undo_move(pending.seq).await.is_none());
    assert!(store.undo_last_move().await.is_none());
    assert_eq!(store.service().call_count(), calls_before);
    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::Done);

    in_flight.await.unwrap().unwrap();
    assert_eq!(store.history(), vec![pending]);
}

#[tokio::test]
async fn undo_of_evicted_move_is_a_noop() {
    let x = Task::from_new(NewTask::titled("x"));
    let y = Task::from_new(NewTask::titled("y"));
    let (store, _events) = loaded_store(vec![x.clone(), y.clone()], &fast_config()).await;

    let first = store
        .update_status(&x.id, TaskStatus::Done)
        .await
        .unwrap()
        .unwrap();
    let second = store
        .update_status(&y.id, TaskStatus::Done)
        .await
        .unwrap()
        .unwrap();
    let calls_before = store.service().call_count();

    assert!(store.undo_move(first.seq).await.is_none());
    assert_eq!(store.service().call_count(), calls_before);
    assert_eq!(store.task(&x.id).unwrap().status, TaskStatus::Done);
    assert_eq!(store.history(), vec![second]);
}

#[tokio::test]
async fn moves_on_different_tasks_run_concurrently() {
    let tasks: Vec<Task> = (0..4)
        .map(|i| Task::from_new(NewTask::titled(format!("task {i}"))))
        .collect();
    let (store, _events) = loaded_store(tasks.clone(), &fast_config()).await;
    store.service().set_latency(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let moves = tasks.iter().map(|t| {
        let store = Arc::clone(&store);
        let id = t.id.clone();
        async move { store.update_status(&id, TaskStatus::Done).await }
    });
    let results = futures_util::future::join_all(moves).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(started.elapsed() < Duration::from_millis(350));
    assert_eq!(store.snapshot().column(TaskStatus::Done).len(), 4);
}

#[tokio::test]
async fn failed_move_does_not_stomp_later_success_on_same_task() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, _events) = loaded_store(vec![t.clone()], &fast_config()).await;
    store.service().set_latency(Duration::from_millis(20));
    store.service().fail_next(3, &unavailable());

    let first = {
        let store = Arc::clone(&store);
        let id = t.id.clone();
        tokio::spawn(async move { store.update_status(&id, TaskStatus::InProgress).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let store = Arc::clone(&store);
        let id = t.id.clone();
        tokio::spawn(async move { store.update_status(&id, TaskStatus::Done).await })
    };

    assert!(first.await.unwrap().is_err());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(store.task(&t.id).unwrap().status, TaskStatus::Done);
    assert_eq!(store.service().task(&t.id).unwrap().status, TaskStatus::Done);
}

// ---------------------------------------------------------------------------
// Create, edit, delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_delete_restores_id_set() {
    let existing = Task::from_new(NewTask::titled("keep"));
    let (store, _events) = loaded_store(vec![existing], &fast_config()).await;
    let before = ids(&store.snapshot().tasks);

    let created = store
        .create(NewTask::titled("temp").with_priority(Priority::Low))
        .await
        .unwrap();
    assert!(ids(&store.snapshot().tasks).contains(&created.id));

    assert!(store.delete(&created.id).await.unwrap());
    assert_eq!(ids(&store.snapshot().tasks), before);
    assert_eq!(ids(&store.service().tasks()), before);
}

#[tokio::test]
async fn validation_failure_is_never_sent() {
    let (store, _events) = loaded_store(Vec::new(), &fast_config()).await;
    let before = store.service().call_count();

    let long = "x".repeat(taskboard_proto::task::MAX_TASK_TITLE_LENGTH + 1);
    assert!(matches!(
        store.create(NewTask::titled(long)).await,
        Err(StoreError::Validation(_))
    ));
    assert_eq!(store.service().call_count(), before);
}

#[tokio::test]
async fn edit_is_pessimistic() {
    let t = Task::from_new(NewTask::titled("draft"));
    let (store, _events) = loaded_store(vec![t.clone()], &fast_config()).await;
    store.service().set_latency(Duration::from_millis(50));

    let pending = {
        let store = Arc::clone(&store);
        let id = t.id.clone();
        tokio::spawn(async move {
            store
                .update_fields(
                    &id,
                    TaskPatch {
                        title: Some("final".into()),
                        ..TaskPatch::default()
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.task(&t.id).unwrap().title, "draft");

    pending.await.unwrap().unwrap();
    assert_eq!(store.task(&t.id).unwrap().title, "final");
    assert_eq!(store.service().task(&t.id).unwrap().title, "final");
}

#[tokio::test]
async fn failed_delete_keeps_task_and_reports() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, mut events) = loaded_store(vec![t.clone()], &fast_config()).await;
    drain(&mut events);
    store.service().fail_always(RemoteError::Unreachable("connection refused".into()));

    assert!(store.delete(&t.id).await.is_err());
    assert!(store.task(&t.id).is_some());
    assert_eq!(
        store.last_error().as_deref(),
        Some("Could not delete task: the task service is not responding")
    );
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| matches!(e, BoardEvent::Failed(_)))
    );
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_recovers_from_transient_failures() {
    let t = Task::from_new(NewTask::titled("T"));
    let (store, _events) = TaskStore::new(
        InMemoryTaskService::with_tasks(vec![t.clone()]),
        &fast_config(),
    );
    store.service().fail_next(2, &unavailable());

    assert_eq!(store.load().await.unwrap(), 1);
    assert_eq!(store.service().calls(), vec![RemoteCall::List; 3]);
    assert!(store.last_error().is_none());
}

#[tokio::test]
async fn load_sets_loading_while_in_flight() {
    let (store, _events) = TaskStore::new(InMemoryTaskService::new(), &fast_config());
    let store = Arc::new(store);
    store.service().set_latency(Duration::from_millis(50));

    let pending = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.load().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(store.snapshot().loading);
    pending.await.unwrap().unwrap();
    assert!(!store.snapshot().loading);
}

#[tokio::test]
async fn priority_order_within_column() {
    let mk = |title: &str, priority| Task::from_new(NewTask::titled(title).with_priority(priority));
    let tasks = vec![
        mk("low", Priority::Low),
        mk("high", Priority::High),
        mk("medium", Priority::Medium),
    ];
    let (store, _events) = loaded_store(tasks, &fast_config()).await;
    let snapshot = store.snapshot();
    let order: Vec<Priority> = snapshot
        .column(TaskStatus::Todo)
        .iter()
        .map(|t| t.priority)
        .collect();
    assert_eq!(order, [Priority::High, Priority::Medium, Priority::Low]);
}
