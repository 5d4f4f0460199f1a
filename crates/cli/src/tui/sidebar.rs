//! Chat sidebar widget: lists the user's chats with the active one marked.

use super::app::TuiApp;
use super::theme::THEME;
use proto::Phase;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use session::KeyValueStore;

/// Fixed sidebar width in terminal columns.
const SIDEBAR_WIDTH: u16 = 30;

/// Returns the fixed sidebar width in columns.
pub fn sidebar_width() -> u16 {
    SIDEBAR_WIDTH
}

/// Renders the chat sidebar with active/hover highlighting.
pub fn render<S: KeyValueStore>(app: &TuiApp<S>, frame: &mut Frame<'_>, area: Rect) {
    let chats = app.session.chats();
    let focus_hint = if app.sidebar_focused {
        Span::styled(" ◉", Style::default().fg(THEME.sidebar_active_indicator))
    } else {
        Span::styled(" [Tab]", Style::default().fg(THEME.fg_muted))
    };
    let header = Line::from(vec![
        Span::styled(
            " Chats ",
            Style::default()
                .fg(THEME.sidebar_active_indicator)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("({})", chats.len()),
            Style::default().fg(THEME.fg_muted),
        ),
        focus_hint,
    ]);

    let border_style = if app.sidebar_focused {
        Style::default().fg(THEME.sidebar_active_indicator)
    } else {
        Style::default().fg(THEME.sidebar_border)
    };
    let block = Block::default()
        .borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)
        .border_style(border_style)
        .title(header);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line<'_>> = Vec::new();
    let max_name_width = inner.width.saturating_sub(2) as usize;

    for (idx, chat) in chats.iter().enumerate() {
        let is_active = idx == app.session.active_index();
        let is_hovered = app.sidebar_focused && idx == app.sidebar_hover;

        let indicator = if is_active {
            Span::styled("▌", Style::default().fg(THEME.sidebar_active_indicator))
        } else if is_hovered {
            Span::styled("▌", Style::default().fg(THEME.sidebar_hover))
        } else {
            Span::raw(" ")
        };

        let name = truncate_str(&chat.title, max_name_width.saturating_sub(2));
        let name_style = if is_active {
            Style::default().fg(THEME.fg).add_modifier(Modifier::BOLD)
        } else if is_hovered {
            Style::default().fg(THEME.fg)
        } else {
            Style::default().fg(THEME.sidebar_text)
        };
        lines.push(Line::from(vec![
            indicator,
            Span::styled(format!(" {name}"), name_style),
        ]));

        let badge = match Phase::reconcile(chat.thread_id.as_ref()) {
            Phase::Waiting => Span::styled("  awaiting reply", Style::default().fg(THEME.warning)),
            _ => Span::styled(
                format!("  {} messages", chat.messages.len()),
                Style::default().fg(THEME.fg_muted),
            ),
        };
        lines.push(Line::from(badge));

        if idx + 1 < chats.len() {
            lines.push(Line::from(Span::styled(
                "─".repeat(max_name_width),
                Style::default().fg(THEME.sidebar_divider),
            )));
        }
    }

    // Keep the hovered entry (3 lines each) in view.
    let focus_row = (app.sidebar_hover as u16).saturating_mul(3);
    let scroll = focus_row.saturating_sub(inner.height.saturating_sub(3));

    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
}

/// Truncates a string to `max_len` characters, appending `…` if shortened.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.trim().is_empty() {
        return "(untitled)".to_string();
    }
    let first_line = s.lines().next().unwrap_or(s);
    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
