//! Status bar rendering.

use std::time::Instant;

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, InputMode};

/// Render the status bar at the bottom of the screen.
///
/// An open undo offer takes precedence over notices, which take precedence
/// over the key help.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let dot_color = if app.backend_label == "offline" {
        theme::OFFLINE
    } else {
        theme::SUCCESS
    };

    let mut spans = vec![
        Span::styled("Taskboard", theme::bold()),
        Span::raw(" | "),
        Span::styled("\u{25cf}", theme::normal().fg(dot_color)),
        Span::raw(format!(" {}", app.backend_label)),
        Span::raw(" | "),
    ];

    if let Some(prompt) = &app.undo_prompt {
        let secs = prompt.remaining(Instant::now()).as_secs_f32().ceil();
        spans.push(Span::styled(
            format!(
                " Moved to {}. Press u to undo ({secs:.0}s) ",
                prompt.record.to
            ),
            theme::undo_prompt(),
        ));
    } else if let Some(notice) = app.notice.as_deref().or(app.snapshot.last_error.as_deref()) {
        spans.push(Span::styled(notice, theme::error()));
    } else {
        spans.push(Span::styled(help_text(&app.mode), theme::dimmed()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}

fn help_text(mode: &InputMode) -> &'static str {
    match mode {
        InputMode::Normal => {
            "←→↑↓: navigate | H/L: move card | 1-3: column | n: new | e: edit | p: priority | d: delete | r: reload | q: quit"
        }
        InputMode::NewTask | InputMode::EditTitle(_) => "Enter: save | Esc: cancel",
    }
}
