//! Full-screen terminal client.

pub mod action;
pub mod app;
pub mod chat;
pub mod event;
pub mod login;
pub mod sidebar;
pub mod theme;

pub use app::TuiApp;
pub use event::run_tui;
