//! Shared protocol types for the research-chat client.
//!
//! This crate defines the persisted chat/message records, the conversation
//! phase, the backend wire bodies and strongly-typed error enums shared
//! across the workspace.

pub mod error;
pub mod message;
pub mod phase;
pub mod wire;

/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of chat and message types.
pub use message::{Chat, ChatId, DEFAULT_CHAT_TITLE, Message, Role, ThreadId};
/// Re-export of the conversation phase.
pub use phase::Phase;
/// Re-export of backend request/reply bodies.
pub use wire::{
    AgentReply, AgentStatus, BackendRequest, HEALTH_PATH, RESUME_PATH, ResumeRequest, START_PATH,
    StartRequest,
};
