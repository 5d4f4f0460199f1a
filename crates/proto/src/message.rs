use serde::{Deserialize, Serialize};

/// Title every chat starts with until its first message arrives.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Numeric chat identifier, unique within one user's chat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub u64);

impl ChatId {
    /// Returns the raw numeric identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChatId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Opaque conversation handle issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Returns the raw thread handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the logged-in user.
    User,
    /// Produced by the agent, or by the client on the agent's behalf (errors).
    Ai,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Ai => write!(f, "ai"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "ai" => Ok(Role::Ai),
            other => Err(crate::error::ProtoError::InvalidRole(other.to_string())),
        }
    }
}

/// One transcript entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote it.
    pub role: Role,
    /// Raw message text.
    pub text: String,
}

impl Message {
    /// Creates a user-authored message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates an agent-authored message.
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            text: text.into(),
        }
    }
}

/// A chat thread as it is persisted in the user's chat list.
///
/// Field names follow the browser client's `localStorage` layout
/// (`threadId` in camelCase) so both front ends share stored data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Identifier within the owning user's list.
    pub id: ChatId,
    /// Sidebar title; `"New Chat"` until the first message.
    pub title: String,
    /// Append-only transcript.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Backend thread handle, absent until the backend issues one.
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<ThreadId>,
}

impl Chat {
    /// Creates an empty chat with the placeholder title.
    pub fn new(id: ChatId) -> Self {
        Self {
            id,
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            thread_id: None,
        }
    }

    /// Returns `true` when nothing has been said in this chat yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
