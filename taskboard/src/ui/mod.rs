//! Terminal UI rendering.

pub mod board_panel;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, InputMode};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let input_height = if app.mode == InputMode::Normal { 0 } else { 3 };
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    board_panel::render(frame, main_chunks[0], app);
    if input_height > 0 {
        board_panel::render_input(frame, main_chunks[1], app);
    }
    status_bar::render(frame, main_chunks[2], app);
}
