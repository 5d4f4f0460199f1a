//! Request and reply bodies of the research-agent backend.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::message::ThreadId;

/// Path of the endpoint that starts a new agent run.
pub const START_PATH: &str = "/chat/start";
/// Path of the endpoint that resumes a paused agent run.
pub const RESUME_PATH: &str = "/chat/resume";
/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/health";

/// Body of `POST /chat/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    /// The user's query, trimmed.
    pub query: String,
}

/// Body of `POST /chat/resume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRequest {
    /// Thread the agent paused on.
    pub thread_id: ThreadId,
    /// Free-text confirmation or correction.
    pub user_response: String,
}

/// The call chosen for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    /// Start a fresh run.
    Start(StartRequest),
    /// Resume the paused run.
    Resume(ResumeRequest),
}

impl BackendRequest {
    /// Endpoint path relative to the backend base URL.
    pub fn path(&self) -> &'static str {
        match self {
            BackendRequest::Start(_) => START_PATH,
            BackendRequest::Resume(_) => RESUME_PATH,
        }
    }

    /// Serializes the JSON body for this request.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BackendRequest::Start(req) => serde_json::json!(req),
            BackendRequest::Resume(req) => serde_json::json!(req),
        }
    }
}

/// Run status reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// The agent paused and wants a user answer.
    Waiting,
    /// The agent finished the run.
    Complete,
    /// The backend failed; `message` explains why.
    Error,
}

/// Reply body shared by both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    /// Run status.
    pub status: AgentStatus,
    /// Text to show as the agent bubble (or the error detail).
    pub message: String,
    /// Thread handle; may be missing or null on `error`.
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
}

impl AgentReply {
    /// Builds a `waiting` reply.
    pub fn waiting(message: impl Into<String>, thread_id: impl Into<ThreadId>) -> Self {
        Self {
            status: AgentStatus::Waiting,
            message: message.into(),
            thread_id: Some(thread_id.into()),
        }
    }

    /// Builds a `complete` reply.
    pub fn complete(message: impl Into<String>, thread_id: impl Into<ThreadId>) -> Self {
        Self {
            status: AgentStatus::Complete,
            message: message.into(),
            thread_id: Some(thread_id.into()),
        }
    }

    /// Builds an `error` reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Error,
            message: message.into(),
            thread_id: None,
        }
    }

    /// Parses a response body. Only `error` replies may omit the thread handle.
    pub fn from_body(body: &str) -> Result<Self, ProtoError> {
        let reply: Self =
            serde_json::from_str(body).map_err(|e| ProtoError::Serialization(e.to_string()))?;
        if reply.status != AgentStatus::Error && reply.thread_id.is_none() {
            return Err(ProtoError::Serialization(format!(
                "{:?} reply without thread_id",
                reply.status
            )));
        }
        Ok(reply)
    }
}
