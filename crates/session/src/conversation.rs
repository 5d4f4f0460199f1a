//! Conversation phase controller: chooses start vs. resume for each input
//! and applies backend outcomes to the chat they belong to.
//!
//! The controller does no IO of its own. [`ChatSession::begin_send`] returns
//! the request to issue together with a [`Ticket`]; whoever performs the call
//! hands the outcome back through [`ChatSession::complete`]. The active chat
//! record is the transcript, so every persisted snapshot equals what is shown.

use proto::{
    AgentReply, AgentStatus, BackendRequest, Chat, ChatId, GatewayError, Message, Phase,
    ResumeRequest, SessionError, StartRequest, ThreadId,
};
use tracing::{debug, info, warn};

use crate::store::{ChatView, KeyValueStore, SessionStore, open_chat};
use crate::title::generate_title;

/// Prefix of the bubble shown for a backend-reported error.
pub const ERROR_PREFIX: &str = "⚠️ Error: ";

/// Hint shown while the agent waits for a confirmation or correction.
pub const WAITING_HINT: &str = "💬 Agent is awaiting your confirmation or correction...";

/// Hint shown after a run completed.
pub const COMPLETE_HINT: &str = "✅ Research complete. Start a new chat or ask a follow-up.";

/// Bubble shown when the backend could not be reached or answered garbage.
pub fn unreachable_message(url: &str) -> String {
    format!("⚠️ Could not reach the backend at {url}. Is the API server running?")
}

/// Identifies one in-flight exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Unique per session.
    pub seq: u64,
    /// Chat the user message was appended to.
    pub chat_id: ChatId,
    /// The trimmed user text.
    pub user_text: String,
    /// Whether the chat was empty before this exchange.
    pub first_message: bool,
}

/// A started exchange: the request to issue and the ticket to complete it with.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    /// Hand back to [`ChatSession::complete`].
    pub ticket: Ticket,
    /// Backend call chosen from the phase.
    pub request: BackendRequest,
}

/// Where a completed exchange landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Appended to the active chat, which is now in this phase.
    Active(Phase),
    /// Appended to a chat the user switched away from; no phase change.
    Background(ChatId),
    /// The exchange is unknown (user logged out meanwhile); nothing changed.
    Dropped,
}

/// A logged-in user's chats plus the phase of the active one.
pub struct ChatSession<S> {
    store: SessionStore<S>,
    user: Option<String>,
    chats: Vec<Chat>,
    active: usize,
    phase: Phase,
    in_flight: Vec<Ticket>,
    next_seq: u64,
}

impl<S: KeyValueStore> ChatSession<S> {
    /// Creates a logged-out session over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store: SessionStore::new(store),
            user: None,
            chats: Vec::new(),
            active: 0,
            phase: Phase::Idle,
            in_flight: Vec::new(),
            next_seq: 0,
        }
    }

    // ── Login ────────────────────────────────────────────────

    /// Logs back in as the remembered user, if there is one.
    pub fn restore(&mut self) -> Result<Option<&str>, SessionError> {
        let Some(user) = self.store.current_user()? else {
            return Ok(None);
        };
        self.open_user(user)?;
        Ok(self.user.as_deref())
    }

    /// Logs in as `name` (trimmed) and remembers it.
    pub fn login(&mut self, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        self.store.remember_user(name)?;
        self.open_user(name.to_string())
    }

    /// Forgets the user and clears all in-memory state. Outstanding
    /// exchanges are abandoned; their replies are dropped.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.store.forget_user()?;
        info!(user = ?self.user, "Logged out");
        self.user = None;
        self.chats.clear();
        self.active = 0;
        self.phase = Phase::Idle;
        self.in_flight.clear();
        Ok(())
    }

    fn open_user(&mut self, user: String) -> Result<(), SessionError> {
        let chats = self.store.load(&user)?;
        self.phase = Phase::reconcile(chats[0].thread_id.as_ref());
        self.chats = chats;
        self.active = 0;
        self.in_flight.clear();
        info!(user = %user, chats = self.chats.len(), "Logged in");
        self.user = Some(user);
        self.persist();
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────

    /// Logged-in display name.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The user's chats in sidebar order.
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    /// Index of the active chat.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The active chat, if logged in.
    pub fn active_chat(&self) -> Option<&Chat> {
        self.chats.get(self.active)
    }

    /// Transcript of the active chat.
    pub fn messages(&self) -> &[Message] {
        self.active_chat()
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Thread handle of the active chat.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.active_chat().and_then(|c| c.thread_id.as_ref())
    }

    /// Phase of the active chat.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the active chat is waiting on the backend.
    pub fn is_typing(&self) -> bool {
        self.active_chat()
            .is_some_and(|chat| self.in_flight.iter().any(|t| t.chat_id == chat.id))
    }

    /// Status line for the active phase.
    pub fn status_hint(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Waiting => Some(WAITING_HINT),
            Phase::Complete => Some(COMPLETE_HINT),
            Phase::Idle => None,
        }
    }

    /// The persistence layer.
    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    // ── Chat list ────────────────────────────────────────────

    /// Appends an empty chat, makes it active and returns its index.
    pub fn new_chat(&mut self) -> Result<usize, SessionError> {
        if self.user.is_none() {
            return Err(SessionError::NotLoggedIn);
        }
        let chat = Chat::new(self.next_chat_id());
        debug!(chat = %chat.id, "New chat");
        self.chats.push(chat);
        self.active = self.chats.len() - 1;
        self.phase = Phase::Idle;
        self.persist();
        Ok(self.active)
    }

    /// Activates chat `index`; its phase is rebuilt from its thread handle.
    pub fn switch(&mut self, index: usize) -> Result<ChatView<'_>, SessionError> {
        if self.user.is_none() {
            return Err(SessionError::NotLoggedIn);
        }
        let phase = open_chat(&self.chats, index)?.phase;
        self.active = index;
        self.phase = phase;
        debug!(index, phase = %phase, "Switched chat");
        open_chat(&self.chats, index)
    }

    fn next_chat_id(&self) -> ChatId {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let max = self.chats.iter().map(|c| c.id.get()).max().unwrap_or(0);
        ChatId(now.max(max + 1))
    }

    // ── Exchange ─────────────────────────────────────────────

    /// Appends the user message to the active chat and returns the backend
    /// call the current phase calls for.
    ///
    /// Nothing changes when this returns an error.
    pub fn begin_send(&mut self, input: &str) -> Result<PendingExchange, SessionError> {
        if self.user.is_none() {
            return Err(SessionError::NotLoggedIn);
        }
        let text = input.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let chat = self
            .chats
            .get(self.active)
            .ok_or(SessionError::NoSuchChat(self.active))?;
        if self.in_flight.iter().any(|t| t.chat_id == chat.id) {
            return Err(SessionError::RequestInFlight);
        }

        let request = if self.phase.resumes() {
            let thread_id = chat
                .thread_id
                .clone()
                .ok_or(SessionError::MissingThreadHandle)?;
            BackendRequest::Resume(ResumeRequest {
                thread_id,
                user_response: text.to_string(),
            })
        } else {
            BackendRequest::Start(StartRequest {
                query: text.to_string(),
            })
        };

        let ticket = Ticket {
            seq: self.next_seq,
            chat_id: chat.id,
            user_text: text.to_string(),
            first_message: chat.is_empty(),
        };
        self.next_seq += 1;

        self.chats[self.active].messages.push(Message::user(text));
        self.in_flight.push(ticket.clone());
        self.persist();
        debug!(
            chat = %ticket.chat_id,
            phase = %self.phase,
            endpoint = request.path(),
            "Exchange started"
        );
        Ok(PendingExchange { ticket, request })
    }

    /// Applies the outcome of the exchange identified by `ticket` to the chat
    /// it was started in, whichever chat is active now.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<AgentReply, GatewayError>,
    ) -> Applied {
        let Some(pos) = self.in_flight.iter().position(|t| t == ticket) else {
            warn!(chat = %ticket.chat_id, seq = ticket.seq, "Dropping reply for an abandoned exchange");
            return Applied::Dropped;
        };
        self.in_flight.remove(pos);
        let Some(index) = self.chats.iter().position(|c| c.id == ticket.chat_id) else {
            warn!(chat = %ticket.chat_id, "Dropping reply for a chat that no longer exists");
            return Applied::Dropped;
        };

        let chat = &mut self.chats[index];
        if ticket.first_message {
            chat.title = generate_title(&ticket.user_text);
        }
        let next = apply_outcome(chat, result);

        let applied = if index == self.active {
            self.phase = next;
            Applied::Active(next)
        } else {
            debug!(chat = %ticket.chat_id, "Reply landed in a background chat");
            Applied::Background(ticket.chat_id)
        };
        self.persist();
        applied
    }

    fn persist(&mut self) {
        let Some(user) = self.user.as_deref() else {
            return;
        };
        if let Err(e) = self.store.save(user, &self.chats) {
            warn!(user, error = %e, "Failed to persist chats");
        }
    }
}

/// Appends the agent bubble for `result` and returns the resulting phase.
fn apply_outcome(chat: &mut Chat, result: Result<AgentReply, GatewayError>) -> Phase {
    let reply = match result {
        Ok(reply) => reply,
        Err(e) => {
            warn!(chat = %chat.id, error = %e, "Backend exchange failed");
            chat.messages.push(Message::ai(unreachable_message(e.url())));
            return Phase::Idle;
        }
    };

    let phase = match reply.status {
        AgentStatus::Error => {
            warn!(chat = %chat.id, message = %reply.message, "Backend reported an error");
            chat.messages
                .push(Message::ai(format!("{ERROR_PREFIX}{}", reply.message)));
            return Phase::Idle;
        }
        AgentStatus::Waiting => Phase::Waiting,
        AgentStatus::Complete => Phase::Complete,
    };

    match reply.thread_id {
        Some(thread_id) => chat.thread_id = Some(thread_id),
        None => warn!(chat = %chat.id, status = ?reply.status, "Reply carried no thread handle"),
    }
    chat.messages.push(Message::ai(reply.message));

    if phase == Phase::Waiting && chat.thread_id.is_none() {
        // Nothing to resume: the next input starts over.
        return Phase::Idle;
    }
    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use proto::Role;

    fn logged_in() -> ChatSession<MemoryStore> {
        let mut session = ChatSession::new(MemoryStore::new());
        session.login("ada").unwrap();
        session
    }

    fn unreachable() -> GatewayError {
        GatewayError::Unreachable {
            url: "http://localhost:8000".into(),
            reason: "connection refused".into(),
        }
    }

    fn stored_chats(session: &ChatSession<MemoryStore>) -> Vec<Chat> {
        let raw = session.store().inner().get("chats_ada").expect("stored chats");
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn login_creates_default_chat_and_persists_it() {
        let session = logged_in();
        assert_eq!(session.user(), Some("ada"));
        assert_eq!(session.chats().len(), 1);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(stored_chats(&session), session.chats());
        assert_eq!(session.store().inner().get("username"), Some("ada"));
    }

    #[test]
    fn login_rejects_blank_name() {
        let mut session = ChatSession::new(MemoryStore::new());
        assert!(matches!(session.login("   "), Err(SessionError::EmptyName)));
        assert!(session.user().is_none());
    }

    #[test]
    fn first_exchange_scenario() {
        let mut session = logged_in();
        let pending = session.begin_send("Hello there, how are you today").unwrap();
        assert_eq!(
            pending.request,
            BackendRequest::Start(StartRequest {
                query: "Hello there, how are you today".into()
            })
        );
        assert!(session.is_typing());

        let applied = session.complete(&pending.ticket, Ok(AgentReply::complete("Hi!", "t1")));

        assert_eq!(applied, Applied::Active(Phase::Complete));
        assert_eq!(
            session.messages(),
            &[
                Message::user("Hello there, how are you today"),
                Message::ai("Hi!")
            ]
        );
        assert_eq!(session.phase(), Phase::Complete);
        assert!(!session.is_typing());

        let stored = stored_chats(&session);
        assert_eq!(stored[0].title, "Hello there how are...");
        assert_eq!(stored[0].thread_id, Some(ThreadId::from("t1")));
        assert_eq!(stored[0].messages.len(), 2);
    }

    #[test]
    fn waiting_phase_resumes_with_thread_handle() {
        let mut session = logged_in();
        let first = session.begin_send("research rust").unwrap();
        session.complete(
            &first.ticket,
            Ok(AgentReply::waiting("Did you mean the language?", "t1")),
        );
        assert_eq!(session.phase(), Phase::Waiting);

        let pending = session.begin_send("yes").unwrap();
        assert_eq!(
            pending.request,
            BackendRequest::Resume(ResumeRequest {
                thread_id: ThreadId::from("t1"),
                user_response: "yes".into(),
            })
        );

        session.complete(&pending.ticket, Ok(AgentReply::complete("Report", "t1")));
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.messages().len(), 4);
    }

    #[test]
    fn complete_phase_starts_a_fresh_run() {
        let mut session = logged_in();
        let first = session.begin_send("topic").unwrap();
        session.complete(&first.ticket, Ok(AgentReply::complete("done", "t1")));

        let next = session.begin_send("follow-up").unwrap();
        assert!(matches!(next.request, BackendRequest::Start(_)));
        assert!(!next.ticket.first_message);
    }

    #[test]
    fn transport_failure_appends_apology_and_keeps_thread() {
        let mut session = logged_in();
        let first = session.begin_send("topic").unwrap();
        session.complete(&first.ticket, Ok(AgentReply::waiting("confirm?", "t1")));

        let pending = session.begin_send("yes").unwrap();
        let applied = session.complete(&pending.ticket, Err(unreachable()));

        assert_eq!(applied, Applied::Active(Phase::Idle));
        assert_eq!(session.messages().len(), 4);
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::Ai);
        assert_eq!(
            last.text,
            "⚠️ Could not reach the backend at http://localhost:8000. Is the API server running?"
        );
        assert_eq!(session.thread_id(), Some(&ThreadId::from("t1")));
    }

    #[test]
    fn backend_error_resets_phase_and_keeps_thread() {
        let mut session = logged_in();
        let first = session.begin_send("topic").unwrap();
        session.complete(&first.ticket, Ok(AgentReply::waiting("confirm?", "t1")));

        let pending = session.begin_send("no, something else").unwrap();
        session.complete(&pending.ticket, Ok(AgentReply::error("graph crashed")));

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.messages().last().unwrap().text, "⚠️ Error: graph crashed");
        assert_eq!(session.thread_id(), Some(&ThreadId::from("t1")));
    }

    #[test]
    fn repeated_clarifications_keep_resuming_the_thread() {
        let mut session = logged_in();
        let first = session.begin_send("topic").unwrap();
        session.complete(&first.ticket, Ok(AgentReply::waiting("which one?", "t1")));

        let second = session.begin_send("the first").unwrap();
        assert!(matches!(second.request, BackendRequest::Resume(_)));
        let applied = session.complete(&second.ticket, Ok(AgentReply::waiting("and when?", "t1")));
        assert_eq!(applied, Applied::Active(Phase::Waiting));

        let third = session.begin_send("last year").unwrap();
        assert_eq!(
            third.request,
            BackendRequest::Resume(ResumeRequest {
                thread_id: ThreadId::from("t1"),
                user_response: "last year".into(),
            })
        );
        assert_eq!(session.messages().len(), 5);
    }

    #[test]
    fn error_after_complete_returns_to_idle() {
        let mut session = logged_in();
        let first = session.begin_send("topic").unwrap();
        session.complete(&first.ticket, Ok(AgentReply::complete("report", "t1")));
        assert_eq!(session.phase(), Phase::Complete);

        let follow_up = session.begin_send("more detail").unwrap();
        let applied = session.complete(&follow_up.ticket, Ok(AgentReply::error("quota")));

        assert_eq!(applied, Applied::Active(Phase::Idle));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.thread_id(), Some(&ThreadId::from("t1")));
        assert_eq!(session.messages().last().unwrap().text, "⚠️ Error: quota");
    }

    #[test]
    fn every_outcome_adds_exactly_two_messages() {
        let outcomes: Vec<Result<AgentReply, GatewayError>> = vec![
            Ok(AgentReply::waiting("w", "t")),
            Ok(AgentReply::complete("c", "t")),
            Ok(AgentReply::error("e")),
            Err(unreachable()),
        ];
        for outcome in outcomes {
            let mut session = logged_in();
            let before = session.messages().len();
            let pending = session.begin_send("hi").unwrap();
            assert_eq!(session.messages().len(), before + 1);
            session.complete(&pending.ticket, outcome);
            assert_eq!(session.messages().len(), before + 2);
        }
    }

    #[test]
    fn first_message_title_is_set_even_on_error() {
        let mut session = logged_in();
        let pending = session.begin_send("one two three four five").unwrap();
        session.complete(&pending.ticket, Err(unreachable()));
        assert_eq!(session.active_chat().unwrap().title, "one two three four...");
        assert!(session.thread_id().is_none());
    }

    #[test]
    fn title_is_only_written_once() {
        let mut session = logged_in();
        let first = session.begin_send("first").unwrap();
        session.complete(&first.ticket, Ok(AgentReply::complete("ok", "t1")));
        let second = session.begin_send("second question here now please").unwrap();
        session.complete(&second.ticket, Ok(AgentReply::complete("ok", "t2")));
        assert_eq!(session.active_chat().unwrap().title, "first");
        assert_eq!(session.thread_id(), Some(&ThreadId::from("t2")));
    }

    #[test]
    fn blank_input_changes_nothing() {
        let mut session = logged_in();
        assert!(matches!(
            session.begin_send("  \n "),
            Err(SessionError::EmptyInput)
        ));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn second_send_on_same_chat_is_refused_while_in_flight() {
        let mut session = logged_in();
        let _pending = session.begin_send("first").unwrap();
        assert!(matches!(
            session.begin_send("second"),
            Err(SessionError::RequestInFlight)
        ));
        assert_eq!(session.messages().len(), 1);

        session.new_chat().unwrap();
        assert!(session.begin_send("other chat").is_ok());
    }

    #[test]
    fn switching_reconciles_phase_from_thread_handle() {
        let mut session = logged_in();
        let pending = session.begin_send("topic").unwrap();
        session.complete(&pending.ticket, Ok(AgentReply::complete("done", "t1")));
        assert_eq!(session.phase(), Phase::Complete);

        session.new_chat().unwrap();
        assert_eq!(session.phase(), Phase::Idle);

        let view = session.switch(0).unwrap();
        assert_eq!(view.phase, Phase::Waiting);
        assert_eq!(session.phase(), Phase::Waiting);

        let view = session.switch(1).unwrap();
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.messages.is_empty());

        assert!(matches!(session.switch(7), Err(SessionError::NoSuchChat(7))));
        assert_eq!(session.active_index(), 1);
    }

    #[test]
    fn reply_after_switch_lands_in_originating_chat() {
        let mut session = logged_in();
        let pending = session.begin_send("slow question").unwrap();
        session.new_chat().unwrap();
        assert!(!session.is_typing());

        let origin = pending.ticket.chat_id;
        let applied = session.complete(&pending.ticket, Ok(AgentReply::waiting("confirm?", "t1")));

        assert_eq!(applied, Applied::Background(origin));
        assert!(session.messages().is_empty());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.chats()[0].messages.len(), 2);
        assert_eq!(session.chats()[0].thread_id, Some(ThreadId::from("t1")));
        assert_eq!(session.chats()[0].title, "slow question");
    }

    #[test]
    fn reply_after_logout_is_dropped() {
        let mut session = logged_in();
        let pending = session.begin_send("question").unwrap();
        session.logout().unwrap();
        session.login("ada").unwrap();

        let applied = session.complete(&pending.ticket, Ok(AgentReply::complete("late", "t1")));
        assert_eq!(applied, Applied::Dropped);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn missing_thread_handle_while_waiting_is_an_error() {
        let mut kv = MemoryStore::new();
        let mut chat = Chat::new(ChatId(1));
        chat.thread_id = Some(ThreadId::from("t1"));
        kv.save("chats_ada", &serde_json::to_string(&vec![chat]).unwrap())
            .unwrap();
        let mut session = ChatSession::new(kv);
        session.login("ada").unwrap();
        assert_eq!(session.phase(), Phase::Waiting);

        session.chats[0].thread_id = None;
        assert!(matches!(
            session.begin_send("yes"),
            Err(SessionError::MissingThreadHandle)
        ));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn restore_reopens_remembered_user_in_reconciled_phase() {
        let mut session = logged_in();
        let pending = session.begin_send("topic").unwrap();
        session.complete(&pending.ticket, Ok(AgentReply::complete("done", "t1")));

        let kv = session.store().inner().clone();
        let mut reopened = ChatSession::new(kv);
        assert_eq!(reopened.restore().unwrap(), Some("ada"));
        assert_eq!(reopened.messages().len(), 2);
        assert_eq!(reopened.phase(), Phase::Waiting);
    }

    #[test]
    fn logout_forgets_user_but_keeps_chats() {
        let mut session = logged_in();
        session.begin_send("keep me").unwrap();
        session.logout().unwrap();

        assert!(session.user().is_none());
        assert!(session.chats().is_empty());
        assert!(session.store().inner().get("username").is_none());
        assert!(session.store().inner().get("chats_ada").is_some());
        assert!(matches!(session.new_chat(), Err(SessionError::NotLoggedIn)));
    }

    #[test]
    fn new_chat_ids_are_unique_and_increasing() {
        let mut session = logged_in();
        session.new_chat().unwrap();
        session.new_chat().unwrap();
        let ids: Vec<u64> = session.chats().iter().map(|c| c.id.get()).collect();
        assert_eq!(ids[0], 1);
        assert!(ids[1] > ids[0]);
        assert!(ids[2] > ids[1]);
        assert_eq!(session.active_index(), 2);
    }

    #[test]
    fn status_hint_follows_phase() {
        let mut session = logged_in();
        assert_eq!(session.status_hint(), None);
        let pending = session.begin_send("topic").unwrap();
        session.complete(&pending.ticket, Ok(AgentReply::waiting("?", "t1")));
        assert_eq!(session.status_hint(), Some(WAITING_HINT));
        let pending = session.begin_send("yes").unwrap();
        session.complete(&pending.ticket, Ok(AgentReply::complete("!", "t1")));
        assert_eq!(session.status_hint(), Some(COMPLETE_HINT));
    }
}
