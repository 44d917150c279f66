//! Integration tests for the timed undo offer: the app opens it when the
//! store commits a move, and it ends either by undo or by expiry, never
//! both.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskboard::app::App;
use taskboard::board::{BoardEvent, StoreConfig, TaskStore};
use taskboard::driver::{self, BoardCommand};
use taskboard::remote::RemoteError;
use taskboard::remote::memory::InMemoryTaskService;
use taskboard::retry::RetryPolicy;
use taskboard_proto::task::{NewTask, Task, TaskStatus};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const WINDOW: Duration = Duration::from_secs(5);

fn press(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

async fn setup() -> (
    Arc<TaskStore<InMemoryTaskService>>,
    mpsc::Receiver<BoardEvent>,
    App,
    Task,
) {
    let task = Task::from_new(NewTask::titled("card"));
    let config = StoreConfig {
        retry: RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(2),
        },
        ..StoreConfig::default()
    };
    let (store, events) =
        TaskStore::new(InMemoryTaskService::with_tasks(vec![task.clone()]), &config);
    store.load().await.unwrap();
    let mut app = App::new().with_undo_window(WINDOW);
    app.set_snapshot(store.snapshot());
    (Arc::new(store), events, app, task)
}

async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Feeds every pending store event to the app, as the main loop does.
fn pump(
    app: &mut App,
    store: &TaskStore<InMemoryTaskService>,
    events: &mut mpsc::Receiver<BoardEvent>,
    now: Instant,
) {
    while let Ok(ev) = events.try_recv() {
        app.apply_event(ev, now);
    }
    app.set_snapshot(store.snapshot());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn undo_within_window_reverts_move() {
    let (store, mut events, mut app, task) = setup().await;
    let t0 = Instant::now();

    let record = store
        .update_status(&task.id, TaskStatus::InProgress)
        .await
        .unwrap()
        .unwrap();
    pump(&mut app, &store, &mut events, t0);
    assert!(app.undo_prompt.is_some());

    assert!(app.tick(t0 + Duration::from_secs(3)).is_none());
    assert_eq!(
        app.handle_key_event(press('u')),
        Some(BoardCommand::Undo(record.seq))
    );

    store.undo_move(record.seq).await.unwrap();
    pump(&mut app, &store, &mut events, t0 + Duration::from_secs(3));
    assert_eq!(store.task(&task.id).unwrap().status, TaskStatus::Todo);
    assert!(app.undo_prompt.is_none());
    // Expiry after an undo has nothing left to end.
    assert!(app.tick(t0 + Duration::from_secs(10)).is_none());
}

#[tokio::test]
async fn expiry_drops_history_entry() {
    let (store, mut events, mut app, task) = setup().await;
    let t0 = Instant::now();

    let record = store
        .update_status(&task.id, TaskStatus::Done)
        .await
        .unwrap()
        .unwrap();
    pump(&mut app, &store, &mut events, t0);

    let cmd = app.tick(t0 + WINDOW).unwrap();
    assert_eq!(cmd, BoardCommand::ExpireMove(record.seq));
    assert!(store.expire_move(record.seq));

    assert!(app.handle_key_event(press('u')).is_none());
    assert!(store.undo_last_move().await.is_none());
    assert_eq!(store.task(&task.id).unwrap().status, TaskStatus::Done);
}

#[tokio::test]
async fn failed_move_never_offers_undo() {
    let (store, mut events, mut app, task) = setup().await;
    store.service().fail_always(RemoteError::Timeout);

    assert!(store.update_status(&task.id, TaskStatus::Done).await.is_err());
    pump(&mut app, &store, &mut events, Instant::now());

    assert!(app.undo_prompt.is_none());
    assert!(app.notice.is_some());
    assert_eq!(
        app.snapshot.task(&task.id).unwrap().status,
        TaskStatus::Todo
    );
}

#[tokio::test]
async fn undo_sync_failure_keeps_local_state_and_notifies() {
    let (store, mut events, mut app, task) = setup().await;
    let t0 = Instant::now();
    store
        .update_status(&task.id, TaskStatus::Done)
        .await
        .unwrap();
    pump(&mut app, &store, &mut events, t0);

    store
        .service()
        .fail_always(RemoteError::Unreachable("connection reset".into()));
    app.handle_key_event(press('u'));
    store.undo_last_move().await.unwrap();
    pump(&mut app, &store, &mut events, t0);

    assert_eq!(store.task(&task.id).unwrap().status, TaskStatus::Todo);
    assert_eq!(
        store.service().task(&task.id).unwrap().status,
        TaskStatus::Done
    );
    assert!(app.notice.as_deref().unwrap().contains("save undo"));
}

#[tokio::test]
async fn full_loop_through_driver() {
    let (store, mut events, mut app, task) = setup().await;
    let (tx, _handle) = driver::spawn_driver(Arc::clone(&store), 16);

    // Move the selected card one column right.
    let cmd = app.handle_key_event(press('L')).unwrap();
    tx.send(cmd).await.unwrap();

    let mut now = Instant::now();
    for _ in 0..200 {
        pump(&mut app, &store, &mut events, now);
        if app.undo_prompt.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(app.undo_prompt.is_some());
    assert_eq!(store.task(&task.id).unwrap().status, TaskStatus::InProgress);

    // Let the window lapse.
    now += WINDOW;
    let expire = app.tick(now).unwrap();
    tx.send(expire).await.unwrap();
    for _ in 0..200 {
        if store.history().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(store.history().is_empty());
    assert_eq!(store.task(&task.id).unwrap().status, TaskStatus::InProgress);

    tx.send(BoardCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn undo_key_reverts_offered_move_while_another_is_in_flight() {
    let x = Task::from_new(NewTask::titled("x"));
    let y = Task::from_new(NewTask::titled("y"));
    let (store, mut events) = TaskStore::new(
        InMemoryTaskService::with_tasks(vec![x.clone(), y.clone()]),
        &StoreConfig::default(),
    );
    store.load().await.unwrap();
    let store = Arc::new(store);
    let mut app = App::new().with_undo_window(WINDOW);
    let (tx, _handle) = driver::spawn_driver(Arc::clone(&store), 16);
    let now = Instant::now();

    let offered = store
        .update_status(&x.id, TaskStatus::Done)
        .await
        .unwrap()
        .unwrap();
    pump(&mut app, &store, &mut events, now);
    assert_eq!(app.undo_prompt.as_ref().unwrap().record.seq, offered.seq);

    // y's move is applied locally but the service has not answered yet.
    store.service().set_latency(Duration::from_millis(300));
    tx.send(BoardCommand::UpdateStatus {
        id: y.id.clone(),
        status: TaskStatus::InProgress,
    })
    .await
    .unwrap();
    wait_until(|| store.task(&y.id).unwrap().status == TaskStatus::InProgress).await;
    pump(&mut app, &store, &mut events, now);
    assert_eq!(app.undo_prompt.as_ref().unwrap().record.seq, offered.seq);

    let cmd = app.handle_key_event(press('u')).unwrap();
    assert_eq!(cmd, BoardCommand::Undo(offered.seq));
    tx.send(cmd).await.unwrap();

    wait_until(|| store.task(&x.id).unwrap().status == TaskStatus::Todo).await;
    assert_eq!(store.task(&y.id).unwrap().status, TaskStatus::InProgress);

    // y's confirmation opens its own offer.
    for _ in 0..200 {
        pump(&mut app, &store, &mut events, now);
        if app.undo_prompt.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(app.undo_prompt.as_ref().unwrap().record.task_id, y.id);
    wait_until(|| store.service().task(&x.id).unwrap().status == TaskStatus::Todo).await;
    assert_eq!(
        store.service().task(&y.id).unwrap().status,
        TaskStatus::InProgress
    );
}

#[tokio::test]
async fn stale_undo_after_newer_commit_changes_nothing() {
    let (store, mut events, mut app, task) = setup().await;
    let now = Instant::now();

    store
        .update_status(&task.id, TaskStatus::InProgress)
        .await
        .unwrap();
    pump(&mut app, &store, &mut events, now);
    let cmd = app.handle_key_event(press('u')).unwrap();
    let BoardCommand::Undo(stale) = cmd else {
        panic!("expected an undo command, got {cmd:?}");
    };

    // A newer move commits before the undo runs and takes the single slot.
    let newer = store
        .update_status(&task.id, TaskStatus::Done)
        .await
        .unwrap()
        .unwrap();
    assert!(store.undo_move(stale).await.is_none());

    assert_eq!(store.task(&task.id).unwrap().status, TaskStatus::Done);
    assert_eq!(store.history(), vec![newer.clone()]);
    pump(&mut app, &store, &mut events, now);
    assert_eq!(app.undo_prompt.as_ref().unwrap().record.seq, newer.seq);
}
