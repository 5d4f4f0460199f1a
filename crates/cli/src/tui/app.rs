//! TUI application state, input mapping and the `update()` reducer.

use std::cell::Cell;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use session::{Applied, ChatSession, KeyValueStore};
use tracing::debug;

use super::action::{Action, Command};
use super::theme::THEME;
use super::{chat, login, sidebar};

/// Spinner animation frames (Braille pattern).
pub const SPINNER: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Which screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Name prompt; no user is logged in.
    Login,
    /// Sidebar and transcript for the logged-in user.
    Chat,
}

// ─── TuiApp ──────────────────────────────────────────────────

/// Full state for the TUI session.
pub struct TuiApp<S> {
    /// Chats, phase and persistence for the logged-in user.
    pub session: ChatSession<S>,
    /// Current screen.
    pub screen: Screen,
    /// Current text typed in the input box (not yet submitted).
    pub input: String,
    /// Cursor position within `input` (byte offset).
    pub cursor_pos: usize,
    /// Whether keys go to the sidebar instead of the input box.
    pub sidebar_focused: bool,
    /// Hovered sidebar row.
    pub sidebar_hover: usize,
    /// Vertical scroll offset for the transcript. Past `transcript_max_scroll`
    /// it means "follow the bottom".
    pub history_scroll: u16,
    /// Largest offset that still moves the transcript, recorded at render.
    pub transcript_max_scroll: Cell<u16>,
    /// One-line message shown in the status bar until the next input.
    pub notice: Option<String>,
    /// Backend shown in the title bar.
    pub backend_url: String,
    /// Spinner animation tick counter.
    pub spinner_tick: u8,
    /// Whether the user requested exit.
    pub should_quit: bool,
}

impl<S: KeyValueStore> TuiApp<S> {
    /// Wraps `session`; the chat screen is shown when someone is logged in.
    pub fn new(session: ChatSession<S>, backend_url: impl Into<String>) -> Self {
        let screen = if session.user().is_some() {
            Screen::Chat
        } else {
            Screen::Login
        };
        let mut app = Self {
            session,
            screen,
            input: String::new(),
            cursor_pos: 0,
            sidebar_focused: false,
            sidebar_hover: 0,
            history_scroll: 0,
            transcript_max_scroll: Cell::new(0),
            notice: None,
            backend_url: backend_url.into(),
            spinner_tick: 0,
            should_quit: false,
        };
        app.sidebar_hover = app.session.active_index();
        app.scroll_to_bottom();
        app
    }

    /// Take the current input and reset it.
    pub fn take_input(&mut self) -> String {
        self.cursor_pos = 0;
        std::mem::take(&mut self.input)
    }

    /// Ensure scroll is at the bottom (for auto-scroll on new messages).
    pub fn scroll_to_bottom(&mut self) {
        // Set to a large value; the transcript clamps it to max_scroll.
        self.history_scroll = u16::MAX;
    }

    // ── Input mapping ────────────────────────────────────────

    /// Maps a key press to an action for the current screen and focus.
    pub fn map_key(&self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return Some(Action::Quit),
            KeyCode::Esc => return Some(Action::Quit),
            _ => {}
        }

        if self.screen == Screen::Login {
            return self.map_input_key(key);
        }

        match key.code {
            KeyCode::Char('n') if ctrl => Some(Action::NewChat),
            KeyCode::Char('l') if ctrl => Some(Action::Logout),
            KeyCode::Tab => Some(Action::ToggleSidebarFocus),
            KeyCode::PageUp => Some(Action::ScrollUp(10)),
            KeyCode::PageDown => Some(Action::ScrollDown(10)),
            KeyCode::Up if self.sidebar_focused => Some(Action::SidebarMove(-1)),
            KeyCode::Down if self.sidebar_focused => Some(Action::SidebarMove(1)),
            KeyCode::Enter if self.sidebar_focused => Some(Action::SelectSidebarChat),
            KeyCode::Up => Some(Action::ScrollUp(1)),
            KeyCode::Down => Some(Action::ScrollDown(1)),
            KeyCode::End => Some(Action::ScrollToBottom),
            _ if self.sidebar_focused => None,
            _ => self.map_input_key(key),
        }
    }

    fn map_input_key(&self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Enter => Some(Action::SubmitInput),
            KeyCode::Backspace => Some(Action::DeleteChar),
            KeyCode::Left => Some(Action::MoveCursorLeft),
            KeyCode::Right => Some(Action::MoveCursorRight),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::InsertChar(c))
            }
            _ => None,
        }
    }

    /// Maps and applies a key press in one step.
    pub fn handle_key(&mut self, key: KeyEvent) -> Command {
        match self.map_key(key) {
            Some(action) => self.update(action),
            None => Command::None,
        }
    }

    // ── Update ───────────────────────────────────────────────

    /// Applies `action` and returns the side effect it requires.
    pub fn update(&mut self, action: Action) -> Command {
        match action {
            Action::InsertChar(c) => {
                self.input.insert(self.cursor_pos, c);
                self.cursor_pos += c.len_utf8();
            }
            Action::DeleteChar => {
                if self.cursor_pos > 0 {
                    // Find the previous character boundary
                    let prev = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    self.input.drain(prev..self.cursor_pos);
                    self.cursor_pos = prev;
                }
            }
            Action::MoveCursorLeft => {
                if self.cursor_pos > 0 {
                    self.cursor_pos = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                }
            }
            Action::MoveCursorRight => {
                if self.cursor_pos < self.input.len() {
                    self.cursor_pos = self.input[self.cursor_pos..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.cursor_pos + i)
                        .unwrap_or(self.input.len());
                }
            }
            Action::SubmitInput => return self.submit(),
            Action::ScrollUp(n) => {
                let max = self.transcript_max_scroll.get();
                self.history_scroll = self.history_scroll.min(max).saturating_sub(n);
            }
            Action::ScrollDown(n) => {
                let next = self.history_scroll.saturating_add(n);
                if next >= self.transcript_max_scroll.get() {
                    self.scroll_to_bottom();
                } else {
                    self.history_scroll = next;
                }
            }
            Action::ScrollToBottom => self.scroll_to_bottom(),
            Action::ToggleSidebarFocus => {
                self.sidebar_focused = !self.sidebar_focused;
                if self.sidebar_focused {
                    self.sidebar_hover = self.session.active_index();
                }
            }
            Action::SidebarMove(delta) => {
                let last = self.session.chats().len().saturating_sub(1) as i64;
                let next = (self.sidebar_hover as i64 + i64::from(delta)).clamp(0, last);
                self.sidebar_hover = next as usize;
            }
            Action::SelectSidebarChat => match self.session.switch(self.sidebar_hover) {
                Ok(view) => {
                    debug!(index = view.index, phase = %view.phase, "Chat selected");
                    self.sidebar_focused = false;
                    self.notice = None;
                    self.scroll_to_bottom();
                }
                Err(e) => self.notice = Some(e.to_string()),
            },
            Action::NewChat => match self.session.new_chat() {
                Ok(index) => {
                    self.sidebar_hover = index;
                    self.sidebar_focused = false;
                    self.notice = None;
                    self.history_scroll = 0;
                }
                Err(e) => self.notice = Some(e.to_string()),
            },
            Action::Logout => match self.session.logout() {
                Ok(()) => {
                    self.screen = Screen::Login;
                    self.take_input();
                    self.sidebar_focused = false;
                    self.sidebar_hover = 0;
                    self.notice = None;
                }
                Err(e) => self.notice = Some(e.to_string()),
            },
            Action::ApplyReply { ticket, result } => {
                match self.session.complete(&ticket, result) {
                    Applied::Active(_) => self.scroll_to_bottom(),
                    Applied::Background(id) => {
                        let title = self
                            .session
                            .chats()
                            .iter()
                            .find(|c| c.id == id)
                            .map(|c| c.title.clone())
                            .unwrap_or_default();
                        self.notice = Some(format!("Reply arrived in \"{title}\""));
                    }
                    Applied::Dropped => {}
                }
            }
            Action::Tick => {
                self.spinner_tick = self.spinner_tick.wrapping_add(1);
            }
            Action::Quit => self.should_quit = true,
        }
        Command::None
    }

    fn submit(&mut self) -> Command {
        if self.input.trim().is_empty() {
            return Command::None;
        }
        match self.screen {
            Screen::Login => match self.session.login(&self.input) {
                Ok(()) => {
                    self.take_input();
                    self.screen = Screen::Chat;
                    self.sidebar_hover = self.session.active_index();
                    self.notice = None;
                    self.scroll_to_bottom();
                    Command::None
                }
                Err(e) => {
                    self.notice = Some(e.to_string());
                    Command::None
                }
            },
            Screen::Chat => match self.session.begin_send(&self.input) {
                Ok(pending) => {
                    self.take_input();
                    self.notice = None;
                    self.scroll_to_bottom();
                    Command::SpawnExchange(pending)
                }
                Err(e) => {
                    self.notice = Some(e.to_string());
                    Command::None
                }
            },
        }
    }

    // ── Rendering ────────────────────────────────────────────

    /// Render the entire TUI into the given frame.
    pub fn render(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        if self.screen == Screen::Login {
            login::render(self, frame, area);
            return;
        }

        let [side, main] = Layout::horizontal([
            Constraint::Length(sidebar::sidebar_width()),
            Constraint::Min(0),
        ])
        .areas(area);
        sidebar::render(self, frame, side);

        // Layout: title(1) | transcript(fill) | status(1) | input(3)
        let [title, history, status, input] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .areas(main);

        self.render_title(frame, title);
        chat::render(self, frame, history);
        self.render_status(frame, status);
        self.render_input(frame, input);
    }

    fn render_title(&self, frame: &mut Frame<'_>, area: Rect) {
        let chat_title = self
            .session
            .active_chat()
            .map(|c| c.title.as_str())
            .unwrap_or_default();
        let title = Line::from(vec![
            Span::styled(
                " research-chat ",
                Style::default()
                    .fg(THEME.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} ", self.session.user().unwrap_or_default()),
                Style::default().fg(THEME.user_label),
            ),
            Span::styled(format!(" {chat_title} "), Style::default().fg(THEME.fg)),
            Span::styled(
                format!(" [{}] ", self.session.phase()),
                Style::default().fg(THEME.fg_muted),
            ),
            Span::styled(
                format!(" {} ", self.backend_url),
                Style::default().fg(THEME.fg_muted),
            ),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    /// Status bar text, highest priority first.
    pub fn status_line(&self) -> Line<'_> {
        if self.session.is_typing() {
            let spinner = SPINNER[(self.spinner_tick as usize) % SPINNER.len()];
            return Line::from(Span::styled(
                format!(" {spinner} Agent is working... "),
                Style::default().fg(THEME.status_spinner),
            ));
        }
        if let Some(notice) = &self.notice {
            return Line::from(Span::styled(
                format!(" {notice}"),
                Style::default().fg(THEME.error),
            ));
        }
        if let Some(hint) = self.session.status_hint() {
            return Line::from(Span::styled(
                format!(" {hint}"),
                Style::default().fg(THEME.warning),
            ));
        }
        Line::from(Span::styled(
            " Enter:send  Tab:chats  Ctrl+N:new  Ctrl+L:logout  PgUp/PgDn:scroll  Esc:quit",
            Style::default().fg(THEME.status_hint),
        ))
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        frame.render_widget(Paragraph::new(self.status_line()), area);
    }

    /// Draws the single-line input box and places the cursor when it has focus.
    pub fn render_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = !self.sidebar_focused;
        let border_color = if focused {
            THEME.border_active
        } else {
            THEME.border
        };
        let placeholder = match self.screen {
            Screen::Login => "Your name...",
            Screen::Chat => "Ask the research agent...",
        };

        let (display_text, input_style) = if self.input.is_empty() {
            (placeholder, Style::default().fg(THEME.fg_muted))
        } else {
            (self.input.as_str(), Style::default().fg(THEME.fg))
        };

        let input = Paragraph::new(Span::styled(display_text, input_style)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Input "),
        );
        frame.render_widget(input, area);

        if focused {
            // Calculate cursor column (char width up to cursor_pos)
            let cursor_col = self.input[..self.cursor_pos].chars().count() as u16;
            frame.set_cursor_position((area.x + 1 + cursor_col, area.y + 1));
        }
    }
}
