//! Board rendering: one bordered list per status column, plus the title
//! input box.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use taskboard_proto::task::{Task, TaskStatus};

use super::theme;
use crate::app::{App, InputMode};

/// Render the three status columns side by side.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);

    for (idx, status) in TaskStatus::ALL.into_iter().enumerate() {
        render_column(frame, columns[idx], app, status);
    }
}

fn render_column(frame: &mut Frame, area: Rect, app: &App, status: TaskStatus) {
    let column = status.column();
    let is_focused = column == app.selected_column;
    let tasks = app.snapshot.column(status);

    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(row, task)| {
            let style = if is_focused && row == app.selected_rows[column] {
                theme::selected()
            } else {
                theme::normal()
            };
            ListItem::new(card_line(task)).style(style)
        })
        .collect();

    let mut title = vec![
        Span::styled(status.label(), theme::column_title(status)),
        Span::styled(format!(" ({})", tasks.len()), theme::dimmed()),
    ];
    if app.snapshot.loading && column == 0 {
        title.push(Span::styled(" loading\u{2026}", theme::dimmed()));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(List::new(items).block(block), area);
}

fn card_line(task: &Task) -> Line<'_> {
    let mut spans = vec![
        Span::styled("\u{25cf} ", theme::normal().fg(theme::priority_color(task.priority))),
        Span::raw(task.title.as_str()),
    ];
    if !task.description.is_empty() {
        spans.push(Span::styled(
            format!(" \u{b7} {}", task.description.lines().next().unwrap_or_default()),
            theme::dimmed(),
        ));
    }
    Line::from(spans)
}

/// Render the title input box for new and edited cards.
pub fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let label = match app.mode {
        InputMode::EditTitle(_) => "Edit title",
        InputMode::NewTask | InputMode::Normal => "New task",
    };

    let mut display_text = app.input.clone();
    let cursor_byte = display_text
        .char_indices()
        .nth(app.cursor_position)
        .map_or(display_text.len(), |(i, _)| i);
    display_text.insert(cursor_byte, '\u{2588}');

    let block = Block::default()
        .title(label)
        .borders(Borders::ALL)
        .border_style(theme::highlighted());

    let paragraph = Paragraph::new(Line::from(Span::styled(display_text, theme::normal())))
        .block(block);
    frame.render_widget(paragraph, area);
}
