//! Transcript widget: renders chat bubbles and the typing indicator.

use proto::Role;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use session::{Bubble, Inline, KeyValueStore, render_all};

use super::app::{SPINNER, TuiApp};
use super::theme::THEME;

const USER_LABEL: &str = "You: ";
const AGENT_LABEL: &str = "Agent: ";

/// Renders the active chat's transcript, clamped to the bottom.
pub fn render<S: KeyValueStore>(app: &TuiApp<S>, frame: &mut Frame<'_>, area: Rect) {
    let bubbles = render_all(app.session.messages());
    let spinner = app
        .session
        .is_typing()
        .then(|| SPINNER[(app.spinner_tick as usize) % SPINNER.len()]);
    let lines = transcript_lines(&bubbles, spinner);

    // Height after wrapping, measured inside the block borders.
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let content_height = paragraph.line_count(area.width.saturating_sub(2));
    let content_height = u16::try_from(content_height).unwrap_or(u16::MAX);
    let visible_height = area.height.saturating_sub(2);
    let max_scroll = content_height.saturating_sub(visible_height);
    app.transcript_max_scroll.set(max_scroll);
    let scroll = app.history_scroll.min(max_scroll);

    let history = paragraph
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(THEME.border)),
        )
        .scroll((scroll, 0));

    frame.render_widget(history, area);
}

/// Lays out bubbles as terminal lines. `typing` is the spinner frame to show
/// below the last bubble while a reply is pending.
pub fn transcript_lines(bubbles: &[Bubble], typing: Option<char>) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    if bubbles.is_empty() && typing.is_none() {
        lines.push(Line::from(Span::styled(
            " Ask the research agent anything.",
            Style::default().fg(THEME.fg_muted),
        )));
        return lines;
    }

    for bubble in bubbles {
        lines.push(Line::from(""));
        let (label, color) = match bubble.role {
            Role::User => (USER_LABEL, THEME.user_label),
            Role::Ai => (AGENT_LABEL, THEME.agent_label),
        };
        let indent = " ".repeat(label.chars().count());
        let mut current = vec![Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];

        for span in &bubble.spans {
            match span {
                Inline::Text(text) => push_text(&mut lines, &mut current, &indent, text, Style::default()),
                Inline::Strong(text) => push_text(
                    &mut lines,
                    &mut current,
                    &indent,
                    text,
                    Style::default()
                        .fg(THEME.agent_strong)
                        .add_modifier(Modifier::BOLD),
                ),
                Inline::LineBreak => {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    current.push(Span::raw(indent.clone()));
                }
            }
        }
        lines.push(Line::from(current));
    }

    if let Some(frame) = typing {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                AGENT_LABEL,
                Style::default()
                    .fg(THEME.agent_label)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{frame} thinking..."),
                Style::default().fg(THEME.status_spinner),
            ),
        ]));
    }

    lines
}

/// User text may hold raw newlines; they start indented continuation lines.
fn push_text(
    lines: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
    indent: &str,
    text: &str,
    style: Style,
) {
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            lines.push(Line::from(std::mem::take(current)));
            current.push(Span::raw(indent.to_string()));
        }
        if !part.is_empty() {
            current.push(Span::styled(part.to_string(), style));
        }
    }
}
