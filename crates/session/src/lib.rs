//! Client-side chat session bookkeeping.
//!
//! Everything here is synchronous and IO-free apart from the injected
//! [`KeyValueStore`]: the phase controller, the per-user chat store, the
//! title generator and the message renderer. Backend calls live in the
//! `gateway` crate.

pub mod conversation;
pub mod render;
pub mod store;
pub mod title;

pub use conversation::{
    Applied, COMPLETE_HINT, ChatSession, ERROR_PREFIX, PendingExchange, Ticket, WAITING_HINT,
    unreachable_message,
};
pub use render::{Bubble, Inline, format_agent_text, render, render_all};
pub use store::{
    ChatView, FileStore, KeyValueStore, MemoryStore, SessionStore, USERNAME_KEY, chats_key,
    default_chats, open_chat,
};
pub use title::generate_title;
