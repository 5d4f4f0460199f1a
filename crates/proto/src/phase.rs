use serde::{Deserialize, Serialize};

use crate::message::ThreadId;

/// Conversation phase of the active chat.
///
/// Decides which backend endpoint the next user input goes to. Never
/// persisted; see [`Phase::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No run in progress; the next input starts one.
    #[default]
    Idle,
    /// The agent paused and expects a free-text answer; the next input resumes.
    Waiting,
    /// The run finished; the next input starts a fresh run.
    Complete,
}

impl Phase {
    /// Rebuilds the phase of a chat that is being (re)opened.
    ///
    /// A stored thread handle always means `Waiting`, even when the backend
    /// already finished that thread: the client never asks the backend for
    /// thread status, so a revisited chat resumes rather than restarts.
    pub fn reconcile(thread_id: Option<&ThreadId>) -> Self {
        if thread_id.is_some() {
            Phase::Waiting
        } else {
            Phase::Idle
        }
    }

    /// Returns `true` when the next input resumes an existing thread.
    pub fn resumes(self) -> bool {
        self == Phase::Waiting
    }

    /// Returns the lowercase wire/display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Waiting => "waiting",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
