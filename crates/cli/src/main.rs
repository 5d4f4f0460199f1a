//! CLI entrypoint and subcommand orchestration.

mod config;
#[cfg(test)]
mod test_support;
mod tui;

use clap::{Parser, Subcommand};
use proto::{Chat, Phase};
use session::{ChatSession, Inline, KeyValueStore, format_agent_text};

#[cfg(not(test))]
use std::sync::Arc;

#[cfg(not(test))]
use config::Config;
#[cfg(not(test))]
use gateway::{Backend, HttpBackend};
#[cfg(not(test))]
use session::FileStore;
#[cfg(not(test))]
use tracing::{info, warn};
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for the research-chat client.
#[derive(Parser)]
#[command(name = "research-chat")]
#[command(about = "Terminal client for a human-in-the-loop research agent", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.research-chat/logs/
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Log in as this user instead of the remembered one
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Start the full-screen TUI (default when no subcommand is given)
    Tui,

    /// Send one message and print the agent's reply
    Ask {
        /// Message to send
        #[arg(short = 'e', long)]
        exec: String,

        /// Chat number as listed by `chats` (default: the last one)
        #[arg(long)]
        chat: Option<usize>,
    },

    /// List the user's chats
    Chats,

    /// Check that the backend is reachable
    Health,
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine effective command (default to Tui if none given)
    let command = cli.command.unwrap_or(Commands::Tui);
    let is_tui = matches!(command, Commands::Tui);

    // Initialize tracing; console output is suppressed in TUI mode to avoid corrupting the display.
    // --debug adds a daily-rotated file log under ~/.research-chat/logs/.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let log_dir = config::app_dir().join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    match (is_tui, debug_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug,hyper_util=info,rustls=info,reqwest=info"));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug,hyper_util=info,rustls=info,reqwest=info"));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        let cmd_label = match &command {
            Commands::Tui => "tui",
            Commands::Ask { .. } => "ask",
            Commands::Chats => "chats",
            Commands::Health => "health",
        };
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = cmd_label,
            log_level = %cli.log_level,
            "========== research-chat session start =========="
        );
    }

    // Load config
    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config ({e}), using defaults");
        Config::default()
    });

    match command {
        Commands::Tui => cmd_tui(config, cli.user).await,
        Commands::Ask { exec, chat } => cmd_ask(config, cli.user, exec, chat).await,
        Commands::Chats => cmd_chats(config, cli.user),
        Commands::Health => cmd_health(config).await,
    }
}

#[cfg(not(test))]
fn build_backend(config: &Config) -> anyhow::Result<HttpBackend> {
    Ok(HttpBackend::with_timeout(
        config.backend.url.clone(),
        config.backend.timeout(),
    )?)
}

#[cfg(not(test))]
fn file_session(config: &Config) -> ChatSession<FileStore> {
    let store = FileStore::new(config.storage.resolved_dir());
    tracing::debug!(dir = %store.dir().display(), "Opening chat store");
    ChatSession::new(store)
}

#[cfg(not(test))]
/// Starts the full-screen TUI.
async fn cmd_tui(config: Config, user: Option<String>) -> anyhow::Result<()> {
    let backend = build_backend(&config)?;
    let mut session = file_session(&config);
    match user {
        Some(name) => session.login(&name)?,
        None => {
            session.restore()?;
        }
    }
    let app = tui::TuiApp::new(session, backend.base_url());
    tui::run_tui(app, Arc::new(backend)).await
}

#[cfg(not(test))]
/// Sends one message from the command line and prints the reply.
async fn cmd_ask(
    config: Config,
    user: Option<String>,
    exec: String,
    chat: Option<usize>,
) -> anyhow::Result<()> {
    let backend = build_backend(&config)?;
    let mut session = file_session(&config);
    open_user(&mut session, user.as_deref())?;
    let index = resolve_chat_index(session.chats().len(), chat)?;
    session.switch(index)?;

    println!("{}", format_ask_header(&exec, backend.base_url()));
    let applied = gateway::exchange(&mut session, &backend, &exec).await?;
    tracing::debug!(outcome = ?applied, "ask finished");

    if let Some(reply) = session.messages().last() {
        println!("{}", plain_text(&format_agent_text(&reply.text)));
    }
    if let Some(hint) = session.status_hint() {
        println!("\n{hint}");
    }
    Ok(())
}

#[cfg(not(test))]
/// Prints the user's chats.
fn cmd_chats(config: Config, user: Option<String>) -> anyhow::Result<()> {
    let mut session = file_session(&config);
    open_user(&mut session, user.as_deref())?;
    for (index, chat) in session.chats().iter().enumerate() {
        println!("{}", format_chat_row(index, chat));
    }
    Ok(())
}

#[cfg(not(test))]
/// Probes the backend's health endpoint.
async fn cmd_health(config: Config) -> anyhow::Result<()> {
    let backend = build_backend(&config)?;
    match backend.health().await {
        Ok(()) => {
            println!("✓ Backend at {} is healthy", backend.base_url());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ {e}");
            std::process::exit(1);
        }
    }
}

/// Logs in as `user`, or restores the remembered user.
fn open_user<S: KeyValueStore>(
    session: &mut ChatSession<S>,
    user: Option<&str>,
) -> anyhow::Result<()> {
    match user {
        Some(name) => session.login(name)?,
        None => {
            if session.restore()?.is_none() {
                anyhow::bail!("No user is logged in. Pass --user NAME.");
            }
        }
    }
    Ok(())
}

/// Maps a 1-based chat number to an index; `None` selects the last chat.
fn resolve_chat_index(len: usize, chat: Option<usize>) -> anyhow::Result<usize> {
    match chat {
        None => Ok(len.saturating_sub(1)),
        Some(n) if (1..=len).contains(&n) => Ok(n - 1),
        Some(n) => anyhow::bail!("No chat #{n}; there are {len}"),
    }
}

/// One line of `chats` output.
fn format_chat_row(index: usize, chat: &Chat) -> String {
    let phase = Phase::reconcile(chat.thread_id.as_ref());
    format!(
        "{:>3}. {}  [{}] {} messages",
        index + 1,
        chat.title,
        phase,
        chat.messages.len()
    )
}

fn format_ask_header(exec: &str, backend: &str) -> String {
    format!("Asking {backend}: {exec}")
}

/// Flattens rendered agent text for plain terminal output.
fn plain_text(spans: &[Inline]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Inline::Text(text) | Inline::Strong(text) => out.push_str(text),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}
