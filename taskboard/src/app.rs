//! Application state and key handling for the board TUI.
//!
//! The app never talks to the store directly: key presses produce
//! [`BoardCommand`]s for the driver, and store output arrives as
//! [`BoardSnapshot`]s and [`BoardEvent`]s.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskboard_proto::task::{NewTask, Task, TaskId, TaskPatch, TaskStatus};

use crate::board::{BoardEvent, BoardSnapshot, DEFAULT_UNDO_WINDOW, UndoPrompt};
use crate::driver::BoardCommand;

/// What the keyboard is currently driving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Navigating and acting on cards.
    Normal,
    /// Typing the title of a new card.
    NewTask,
    /// Typing a replacement title for an existing card.
    EditTitle(TaskId),
}

/// Main application state.
pub struct App {
    /// Latest copy of the store state.
    pub snapshot: BoardSnapshot,
    /// Focused column (index into [`TaskStatus::ALL`]).
    pub selected_column: usize,
    /// Selected row within each column.
    pub selected_rows: [usize; 3],
    /// Current input mode.
    pub mode: InputMode,
    /// Text being typed in `NewTask` / `EditTitle` mode.
    pub input: String,
    /// Cursor position in `input` (character index).
    pub cursor_position: usize,
    /// Active undo offer, if a move was committed recently.
    pub undo_prompt: Option<UndoPrompt>,
    /// How long an undo offer stays open.
    pub undo_window: Duration,
    /// Transient message for the status bar.
    pub notice: Option<String>,
    /// Backend description shown in the status bar.
    pub backend_label: String,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Card to keep selected once the next snapshot shows it.
    follow: Option<TaskId>,
}

impl App {
    /// Creates an empty app.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: BoardSnapshot::default(),
            selected_column: 0,
            selected_rows: [0; 3],
            mode: InputMode::Normal,
            input: String::new(),
            cursor_position: 0,
            undo_prompt: None,
            undo_window: DEFAULT_UNDO_WINDOW,
            notice: None,
            backend_label: "offline".to_string(),
            should_quit: false,
            follow: None,
        }
    }

    /// Sets the undo window.
    #[must_use]
    pub const fn with_undo_window(mut self, window: Duration) -> Self {
        self.undo_window = window;
        self
    }

    /// Sets the backend description.
    #[must_use]
    pub fn with_backend_label(mut self, label: impl Into<String>) -> Self {
        self.backend_label = label.into();
        self
    }

    /// Status of the focused column.
    #[must_use]
    pub fn selected_status(&self) -> TaskStatus {
        TaskStatus::from_column(self.selected_column).unwrap_or_default()
    }

    /// Card under the cursor.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        let column = self.snapshot.column(self.selected_status());
        column.get(self.selected_rows[self.selected_column]).copied()
    }

    /// Replaces the displayed state and keeps the selection in range.
    pub fn set_snapshot(&mut self, snapshot: BoardSnapshot) {
        self.snapshot = snapshot;
        if let Some(id) = self.follow.take() {
            match self.snapshot.task(&id).map(|t| t.status) {
                Some(status) if status.column() == self.selected_column => {
                    if let Some(row) = self
                        .snapshot
                        .column(status)
                        .iter()
                        .position(|t| t.id == id)
                    {
                        self.selected_rows[self.selected_column] = row;
                    }
                }
                Some(_) => self.follow = Some(id),
                None => {}
            }
        }
        for (column, status) in TaskStatus::ALL.iter().enumerate() {
            let len = self.snapshot.column(*status).len();
            self.selected_rows[column] = self.selected_rows[column].min(len.saturating_sub(1));
        }
    }

    /// Applies a store notification.
    pub fn apply_event(&mut self, event: BoardEvent, now: Instant) {
        match event {
            BoardEvent::Changed => {}
            BoardEvent::MoveCommitted(record) => {
                self.undo_prompt = Some(UndoPrompt::new(record, self.undo_window, now));
            }
            BoardEvent::MoveReverted(record) => {
                self.close_prompt_for(record.seq);
            }
            BoardEvent::UndoApplied(record) => {
                self.close_prompt_for(record.seq);
                self.notice = Some(format!("Moved back to {}", record.from));
            }
            BoardEvent::UndoSyncFailed { message, .. } | BoardEvent::Failed(message) => {
                self.notice = Some(message);
            }
        }
    }

    fn close_prompt_for(&mut self, seq: u64) {
        if self
            .undo_prompt
            .as_ref()
            .is_some_and(|p| p.record.seq == seq)
        {
            self.undo_prompt = None;
        }
    }

    /// Closes an expired undo offer and returns the command that ends its
    /// history entry.
    pub fn tick(&mut self, now: Instant) -> Option<BoardCommand> {
        if self.undo_prompt.as_ref().is_some_and(|p| p.is_expired(now)) {
            let prompt = self.undo_prompt.take()?;
            return Some(BoardCommand::ExpireMove(prompt.record.seq));
        }
        None
    }

    /// Handles a key event, returning a command when the key maps to a
    /// store operation.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::NewTask | InputMode::EditTitle(_) => self.handle_input_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_column = self.selected_column.saturating_sub(1);
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.selected_column = (self.selected_column + 1).min(TaskStatus::ALL.len() - 1);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let row = &mut self.selected_rows[self.selected_column];
                *row = row.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.snapshot.column(self.selected_status()).len();
                let row = &mut self.selected_rows[self.selected_column];
                if *row + 1 < len {
                    *row += 1;
                }
                None
            }
            KeyCode::Char('H' | '<') => self.move_selected(self.selected_status().previous()),
            KeyCode::Char('L' | '>') => self.move_selected(self.selected_status().next()),
            KeyCode::Char(c @ '1'..='3') => {
                let column = usize::from(c as u8 - b'1');
                self.move_selected(TaskStatus::from_column(column)?)
            }
            KeyCode::Char('n') => {
                self.start_input(InputMode::NewTask, String::new());
                None
            }
            KeyCode::Char('e') => {
                let task = self.selected_task()?;
                let (id, title) = (task.id.clone(), task.title.clone());
                self.start_input(InputMode::EditTitle(id), title);
                None
            }
            KeyCode::Char('p') => {
                let task = self.selected_task()?;
                Some(BoardCommand::UpdateFields {
                    id: task.id.clone(),
                    patch: TaskPatch {
                        priority: Some(task.priority.cycle()),
                        ..TaskPatch::default()
                    },
                })
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let id = self.selected_task()?.id.clone();
                Some(BoardCommand::Delete(id))
            }
            KeyCode::Char('u') => {
                let prompt = self.undo_prompt.take()?;
                Some(BoardCommand::Undo(prompt.record.seq))
            }
            KeyCode::Char('r') => {
                self.notice = None;
                Some(BoardCommand::Load)
            }
            _ => None,
        }
    }

    /// Moves the selected card to `status` and keeps it selected.
    fn move_selected(&mut self, status: TaskStatus) -> Option<BoardCommand> {
        let task = self.selected_task()?;
        if task.status == status {
            return None;
        }
        let id = task.id.clone();
        self.selected_column = status.column();
        self.follow = Some(id.clone());
        Some(BoardCommand::UpdateStatus { id, status })
    }

    fn start_input(&mut self, mode: InputMode, initial: String) {
        self.cursor_position = initial.chars().count();
        self.input = initial;
        self.mode = mode;
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Esc => {
                self.finish_input();
                None
            }
            KeyCode::Enter => self.submit_input(),
            KeyCode::Char(c) => {
                self.enter_char(c);
                None
            }
            KeyCode::Backspace => {
                self.delete_char();
                None
            }
            KeyCode::Left => {
                self.cursor_position = self.cursor_position.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                if self.cursor_position < self.input.chars().count() {
                    self.cursor_position += 1;
                }
                None
            }
            KeyCode::Home => {
                self.cursor_position = 0;
                None
            }
            KeyCode::End => {
                self.cursor_position = self.input.chars().count();
                None
            }
            _ => None,
        }
    }

    fn submit_input(&mut self) -> Option<BoardCommand> {
        let title = self.input.trim().to_string();
        let mode = std::mem::replace(&mut self.mode, InputMode::Normal);
        self.finish_input();
        if title.is_empty() {
            return None;
        }
        match mode {
            InputMode::NewTask => {
                self.selected_column = TaskStatus::Todo.column();
                Some(BoardCommand::Create(NewTask::titled(title)))
            }
            InputMode::EditTitle(id) => {
                let unchanged = self.snapshot.task(&id).is_some_and(|t| t.title == title);
                if unchanged {
                    return None;
                }
                Some(BoardCommand::UpdateFields {
                    id,
                    patch: TaskPatch {
                        title: Some(title),
                        ..TaskPatch::default()
                    },
                })
            }
            InputMode::Normal => None,
        }
    }

    fn finish_input(&mut self) {
        self.mode = InputMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn enter_char(&mut self, c: char) {
        let idx = self.byte_index();
        self.input.insert(idx, c);
        self.cursor_position += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
