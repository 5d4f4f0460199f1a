use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend transport error.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Chat session misuse or state error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Key/value persistence error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal protocol type error.
    #[error("Proto error: {0}")]
    Proto(#[from] ProtoError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Backend gateway errors.
///
/// Every variant counts as a transport failure for the exchange: the
/// conversation shows the same apology bubble whichever one occurs.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response (connect, DNS, timeout...).
    #[error("Backend unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// A response arrived but its body was not a valid agent reply.
    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Health probe answered with a non-success status.
    #[error("Backend at {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl GatewayError {
    /// The backend URL the failing request was addressed to.
    pub fn url(&self) -> &str {
        match self {
            GatewayError::Unreachable { url, .. }
            | GatewayError::InvalidResponse { url, .. }
            | GatewayError::Status { url, .. } => url,
        }
    }
}

/// Key/value persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage backend is missing or refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Chat session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation needs a logged-in user.
    #[error("No user is logged in")]
    NotLoggedIn,

    /// Login was attempted with a blank display name.
    #[error("Display name cannot be empty")]
    EmptyName,

    /// Send was attempted with blank input.
    #[error("Message is empty")]
    EmptyInput,

    /// Chat index is out of range.
    #[error("No chat at index {0}")]
    NoSuchChat(usize),

    /// The chat already has a request in flight.
    #[error("A request for this chat is still in flight")]
    RequestInFlight,

    /// Phase says `waiting` but the chat has no thread to resume.
    #[error("Chat is waiting for a reply but has no thread handle")]
    MissingThreadHandle,

    /// Underlying persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Internal proto errors
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Invalid role string value.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Generic serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
