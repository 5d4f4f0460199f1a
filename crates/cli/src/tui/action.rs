//! Elm Architecture (TEA) action and command types for the TUI.
//!
//! All state mutations flow through [`Action`], and side effects are
//! expressed as [`Command`] values returned from `TuiApp::update()`.

use proto::{AgentReply, GatewayError};
use session::{PendingExchange, Ticket};

// ─── Action ──────────────────────────────────────────────────────────────────

/// Every possible state mutation in the TUI. The `update()` method on
/// `TuiApp` is the *only* place where `Action` variants are matched
/// and applied.
#[derive(Debug)]
pub enum Action {
    // ── Input ────────────────────────────────────────────────
    /// Insert a character at the current cursor position.
    InsertChar(char),
    /// Delete the character before the cursor.
    DeleteChar,
    /// Move the input cursor one character to the left.
    MoveCursorLeft,
    /// Move the input cursor one character to the right.
    MoveCursorRight,
    /// Submit the current input: a name on the login screen, a message
    /// in a chat.
    SubmitInput,

    // ── Navigation ───────────────────────────────────────────
    /// Scroll the transcript up by `n` lines.
    ScrollUp(u16),
    /// Scroll the transcript down by `n` lines.
    ScrollDown(u16),
    /// Jump to the bottom of the transcript.
    ScrollToBottom,
    /// Toggle keyboard focus between sidebar and main input.
    ToggleSidebarFocus,

    // ── Sidebar ──────────────────────────────────────────────
    /// Move the sidebar hover by delta (positive = down).
    SidebarMove(i16),
    /// Activate the hovered chat.
    SelectSidebarChat,

    // ── Session ──────────────────────────────────────────────
    /// Create and activate an empty chat.
    NewChat,
    /// Forget the user and return to the login screen.
    Logout,
    /// A backend call spawned by [`Command::SpawnExchange`] finished.
    ApplyReply {
        ticket: Ticket,
        result: Result<AgentReply, GatewayError>,
    },

    // ── System ───────────────────────────────────────────────
    /// Periodic spinner tick.
    Tick,
    /// Request application quit.
    Quit,
}

// ─── Command ─────────────────────────────────────────────────────────────────

/// Side effects returned by `TuiApp::update()`. The event loop is
/// responsible for executing these asynchronously.
#[derive(Debug)]
pub enum Command {
    /// No side effect.
    None,
    /// Send the request to the backend and feed the outcome back as
    /// [`Action::ApplyReply`].
    SpawnExchange(PendingExchange),
}
