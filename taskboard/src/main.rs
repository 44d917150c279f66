//! Taskboard: terminal kanban board.
//!
//! Connects to a task service over HTTP when a base URL is configured,
//! otherwise runs against an in-memory board. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Offline board
//! cargo run --bin taskboard
//!
//! # Against a running taskboard-server
//! cargo run --bin taskboard -- --base-url http://127.0.0.1:8080
//!
//! # Or via environment variable
//! TASKBOARD_URL=http://127.0.0.1:8080 cargo run --bin taskboard
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::app::App;
use taskboard::board::{BoardEvent, TaskStore};
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::driver::{self, BoardCommand, DEFAULT_COMMAND_CAPACITY};
use taskboard::remote::TaskService;
use taskboard::remote::http::HttpTaskService;
use taskboard::remote::memory::InMemoryTaskService;
use taskboard::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("taskboard starting");

    let remote = match config.base_url.as_deref() {
        Some(url) => match HttpTaskService::new(url, config.request_timeout) {
            Ok(svc) => Some(svc),
            Err(e) => {
                eprintln!("Error: {e}");
                return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
            }
        },
        None => None,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match remote {
        Some(svc) => {
            let label = svc.base_url().to_string();
            run_app(&mut terminal, svc, &config, label).await
        }
        None => run_app(&mut terminal, InMemoryTaskService::new(), &config, "offline".into()).await,
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
async fn run_app<S: TaskService + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    service: S,
    config: &ClientConfig,
    backend_label: String,
) -> io::Result<()> {
    let (store, mut events) = TaskStore::new(service, &config.store_config());
    let store = Arc::new(store);
    let (cmd_tx, _driver) = driver::spawn_driver(Arc::clone(&store), DEFAULT_COMMAND_CAPACITY);

    let mut app = App::new()
        .with_undo_window(config.undo_window)
        .with_backend_label(backend_label);

    send(&mut app, &cmd_tx, BoardCommand::Load);

    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Apply store output.
        drain_board_events(&mut app, &store, &mut events);

        // Step 3: Close a lapsed undo offer.
        if let Some(cmd) = app.tick(Instant::now()) {
            send(&mut app, &cmd_tx, cmd);
        }

        // Step 4: Poll for terminal input.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(cmd) = app.handle_key_event(key) {
                send(&mut app, &cmd_tx, cmd);
            }
        }

        if app.should_quit {
            let _ = cmd_tx.try_send(BoardCommand::Shutdown);
            return Ok(());
        }
    }
}

fn send(app: &mut App, tx: &mpsc::Sender<BoardCommand>, cmd: BoardCommand) {
    match tx.try_send(cmd) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            app.notice = Some("Busy, command dropped".to_string());
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            app.notice = Some("Board stopped".to_string());
        }
    }
}

/// Drain pending store events and refresh the displayed snapshot.
fn drain_board_events<S: TaskService>(
    app: &mut App,
    store: &TaskStore<S>,
    rx: &mut mpsc::Receiver<BoardEvent>,
) {
    let mut changed = false;
    let now = Instant::now();
    while let Ok(event) = rx.try_recv() {
        changed = true;
        app.apply_event(event, now);
    }
    if changed {
        app.set_snapshot(store.snapshot());
    }
}
