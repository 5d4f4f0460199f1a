//! Centralized TUI theme built on ratatui's Tailwind CSS palette.

use ratatui::style::Color;
use ratatui::style::palette::tailwind;

/// The application theme — all visual tokens in one place.
pub struct Theme {
    // ── Base ──
    /// Primary foreground/text color.
    pub fg: Color,
    /// Muted foreground for minimal-emphasis elements.
    pub fg_muted: Color,
    /// Default border color for panels and widgets.
    pub border: Color,
    /// Border color for the active/focused widget.
    pub border_active: Color,

    // ── Accent / Brand ──
    /// Primary accent/brand color.
    pub accent: Color,

    // ── Semantic ──
    /// Color for success indicators.
    pub success: Color,
    /// Color for warning indicators.
    pub warning: Color,
    /// Color for error indicators.
    pub error: Color,

    // ── Chat roles ──
    /// Label color for user messages in chat.
    pub user_label: Color,
    /// Label color for agent replies in chat.
    pub agent_label: Color,
    /// Emphasized (`**bold**`) agent text.
    pub agent_strong: Color,

    // ── Status bar ──
    /// Spinner animation color in the status bar.
    pub status_spinner: Color,
    /// Hint/keybinding text color in the status bar.
    pub status_hint: Color,

    // ── Sidebar ──
    /// Border around the chat sidebar panel.
    pub sidebar_border: Color,
    /// Indicator mark for the active chat entry.
    pub sidebar_active_indicator: Color,
    /// Hover highlight color for sidebar entries.
    pub sidebar_hover: Color,
    /// Chat title color in the sidebar.
    pub sidebar_text: Color,
    /// Horizontal divider between sidebar entries.
    pub sidebar_divider: Color,

    // ── Login screen ──
    /// Banner color on the login screen.
    pub logo: Color,
}

impl Theme {
    /// The default dark theme using Tailwind palette.
    pub const fn default_dark() -> Self {
        Self {
            // Base
            fg: tailwind::SLATE.c100,
            fg_muted: tailwind::SLATE.c500,
            border: tailwind::SLATE.c700,
            border_active: tailwind::INDIGO.c400,

            // Accent
            accent: tailwind::INDIGO.c500,

            // Semantic
            success: tailwind::EMERALD.c500,
            warning: tailwind::AMBER.c500,
            error: tailwind::RED.c500,

            // Chat
            user_label: tailwind::CYAN.c400,
            agent_label: tailwind::INDIGO.c400,
            agent_strong: tailwind::SLATE.c50,

            // Status bar
            status_spinner: tailwind::AMBER.c400,
            status_hint: tailwind::SLATE.c500,

            // Sidebar
            sidebar_border: tailwind::SLATE.c700,
            sidebar_active_indicator: tailwind::CYAN.c400,
            sidebar_hover: tailwind::SLATE.c600,
            sidebar_text: tailwind::SLATE.c300,
            sidebar_divider: tailwind::SLATE.c800,

            // Login
            logo: tailwind::INDIGO.c400,
        }
    }
}

/// Global theme instance.
pub const THEME: Theme = Theme::default_dark();
