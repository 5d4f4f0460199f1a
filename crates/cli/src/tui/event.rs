//! Async event loop for the TUI: interleaves crossterm input, backend
//! replies, and the spinner timer.

use std::sync::Arc;

use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use gateway::Backend;
use proto::{AgentReply, GatewayError};
use ratatui::{Terminal, backend::CrosstermBackend};
use session::{KeyValueStore, PendingExchange, Ticket};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::action::{Action, Command};
use super::app::TuiApp;

/// A finished backend call, tagged with the exchange it belongs to.
type Completion = (Ticket, Result<AgentReply, GatewayError>);

/// RAII guard that restores the terminal on drop (even on panic).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
    }
}

/// Runs one backend call in the background; the outcome comes back on `tx`.
fn spawn_exchange(
    backend: Arc<dyn Backend>,
    pending: PendingExchange,
    tx: mpsc::UnboundedSender<Completion>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let PendingExchange { ticket, request } = pending;
        debug!(chat = %ticket.chat_id, endpoint = request.path(), "Backend call started");
        let result = backend.dispatch(&request).await;
        // The receiver is gone once the TUI has exited.
        let _ = tx.send((ticket, result));
    })
}

/// Run the full-screen TUI until the user quits.
pub async fn run_tui<S: KeyValueStore>(
    mut app: TuiApp<S>,
    backend: Arc<dyn Backend>,
) -> anyhow::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard; // Drop restores terminal

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    info!(backend = %backend.base_url(), user = ?app.session.user(), "TUI started");

    let mut crossterm_stream = EventStream::new();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Completion>();

    // Spinner tick interval (100ms)
    let mut spinner_interval = tokio::time::interval(std::time::Duration::from_millis(100));
    spinner_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        let command = tokio::select! {
            maybe_event = crossterm_stream.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(_)) => Command::None,
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },

            Some((ticket, result)) = reply_rx.recv() => {
                app.update(Action::ApplyReply { ticket, result })
            }

            _ = spinner_interval.tick(), if app.session.is_typing() => app.update(Action::Tick),
        };

        match command {
            Command::SpawnExchange(pending) => {
                spawn_exchange(backend.clone(), pending, reply_tx.clone());
            }
            Command::None => {}
        }

        if app.should_quit {
            break;
        }
    }

    info!("TUI exited");
    // TerminalGuard::drop handles cleanup
    Ok(())
}
