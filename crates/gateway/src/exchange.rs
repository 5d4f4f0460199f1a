//! Drives one send through a [`ChatSession`] and a [`Backend`].

use proto::SessionError;
use session::{Applied, ChatSession, KeyValueStore};
use tracing::info;

use crate::backend::Backend;

/// Sends `input` from the active chat and applies the reply.
///
/// The session is borrowed for the whole call, so this suits callers with a
/// single in-flight request (`ask`, tests). Interactive front ends split the
/// call into [`ChatSession::begin_send`] and [`ChatSession::complete`].
pub async fn exchange<S, B>(
    session: &mut ChatSession<S>,
    backend: &B,
    input: &str,
) -> Result<Applied, SessionError>
where
    S: KeyValueStore,
    B: Backend + ?Sized,
{
    let pending = session.begin_send(input)?;
    let result = backend.dispatch(&pending.request).await;
    let applied = session.complete(&pending.ticket, result);
    info!(chat = %pending.ticket.chat_id, outcome = ?applied, "Exchange finished");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use proto::{
        AgentReply, BackendRequest, GatewayError, Phase, ResumeRequest, Role, StartRequest,
        ThreadId,
    };
    use session::{MemoryStore, WAITING_HINT};

    use super::*;

    /// Replays canned outcomes and records every request it sees.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<AgentReply, GatewayError>>>,
        seen: Mutex<Vec<BackendRequest>>,
    }

    impl ScriptedBackend {
        fn with(replies: Vec<Result<AgentReply, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            }
        }

        fn seen(&self) -> Vec<BackendRequest> {
            self.seen.lock().unwrap().clone()
        }

        fn next(&self, request: BackendRequest) -> Result<AgentReply, GatewayError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        fn base_url(&self) -> &str {
            "http://scripted"
        }

        async fn start(&self, request: &StartRequest) -> Result<AgentReply, GatewayError> {
            self.next(BackendRequest::Start(request.clone()))
        }

        async fn resume(&self, request: &ResumeRequest) -> Result<AgentReply, GatewayError> {
            self.next(BackendRequest::Resume(request.clone()))
        }

        async fn health(&self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn session() -> ChatSession<MemoryStore> {
        let mut session = ChatSession::new(MemoryStore::new());
        session.login("ada").unwrap();
        session
    }

    #[tokio::test]
    async fn clarification_round_trip_resumes_the_thread() {
        let backend = ScriptedBackend::with(vec![
            Ok(AgentReply::waiting("Which aspect of Rust?", "t-1")),
            Ok(AgentReply::complete("**Summary**\nDone.", "t-1")),
        ]);
        let mut session = session();

        let applied = exchange(&mut session, &backend, "Research Rust").await.unwrap();
        assert_eq!(applied, Applied::Active(Phase::Waiting));
        assert_eq!(session.status_hint(), Some(WAITING_HINT));

        let applied = exchange(&mut session, &backend, "performance").await.unwrap();
        assert_eq!(applied, Applied::Active(Phase::Complete));

        let seen = backend.seen();
        assert!(matches!(&seen[0], BackendRequest::Start(r) if r.query == "Research Rust"));
        assert!(matches!(
            &seen[1],
            BackendRequest::Resume(r)
                if r.thread_id == ThreadId::from("t-1") && r.user_response == "performance"
        ));
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Ai, Role::User, Role::Ai]);
        assert_eq!(session.active_chat().unwrap().title, "Research Rust");
    }

    #[tokio::test]
    async fn follow_up_after_completion_starts_fresh() {
        let backend = ScriptedBackend::with(vec![
            Ok(AgentReply::complete("done", "t-1")),
            Ok(AgentReply::complete("again", "t-2")),
        ]);
        let mut session = session();
        exchange(&mut session, &backend, "first").await.unwrap();
        exchange(&mut session, &backend, "second").await.unwrap();

        assert!(matches!(&backend.seen()[1], BackendRequest::Start(r) if r.query == "second"));
        assert_eq!(session.thread_id(), Some(&ThreadId::from("t-2")));
    }

    #[tokio::test]
    async fn rejected_input_never_reaches_the_backend() {
        let backend = ScriptedBackend::default();
        let mut session = session();
        let err = exchange(&mut session, &backend, "   ").await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyInput));
        assert!(backend.seen().is_empty());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_leaves_chat_idle() {
        let backend = ScriptedBackend::with(vec![Err(GatewayError::Unreachable {
            url: "http://scripted".into(),
            reason: "connection refused".into(),
        })]);
        let mut session = session();
        let applied = exchange(&mut session, &backend, "hi").await.unwrap();
        assert_eq!(applied, Applied::Active(Phase::Idle));
        assert!(session.messages()[1].text.contains("http://scripted"));
        assert!(!session.is_typing());
    }
}
