//! Backend gateway: the HTTP client for the research agent's start/resume
//! endpoints, plus a helper that runs one exchange through a chat session.

pub mod backend;
pub mod exchange;

/// Backend trait and its reqwest implementation.
pub use backend::{Backend, HttpBackend};
/// One-shot send helper.
pub use exchange::exchange;
