//! Login screen: a banner and the name prompt.

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use session::KeyValueStore;

use super::app::TuiApp;
use super::theme::THEME;

pub fn render<S: KeyValueStore>(app: &TuiApp<S>, frame: &mut Frame<'_>, area: Rect) {
    let [column] = Layout::horizontal([Constraint::Length(60)])
        .flex(Flex::Center)
        .areas(area);
    let [banner, input, notice] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .flex(Flex::Center)
    .areas(column);

    let lines = vec![
        Line::from(Span::styled(
            "research-chat",
            Style::default().fg(THEME.logo).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "What should we call you?",
            Style::default().fg(THEME.fg),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).centered(), banner);
    app.render_input(frame, input);

    let footer = match &app.notice {
        Some(notice) => Span::styled(notice.as_str(), Style::default().fg(THEME.error)),
        None => Span::styled("Enter:continue  Esc:quit", Style::default().fg(THEME.status_hint)),
    };
    frame.render_widget(Paragraph::new(Line::from(footer)).centered(), notice);
}
