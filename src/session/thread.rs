//! Chat sessions and session storage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::watch;
use uuid::Uuid;

use crate::agent::{Agent, AgentEvent, AgentRequest};
use crate::compose::{ChatBackend, RequestOptions, SendMessage};
use crate::conversation::{
    ChatStatus, ConversationSnapshot, Message, Part, Role, ToolPart,
};
use crate::error::{ChatError, Result};

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A single conversation.
///
/// Owns the message list and status, applies agent events to the trailing
/// assistant message and publishes a fresh [`ConversationSnapshot`] after
/// every change. Cloning yields another handle to the same session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    agent: Arc<dyn Agent>,
    state: RwLock<SessionState>,
    updates: watch::Sender<ConversationSnapshot>,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<Message>,
    status: ChatStatus,
    /// Incremented per run; events from older runs are dropped.
    generation: u64,
    last_options: Option<RequestOptions>,
    last_error: Option<String>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl ChatSession {
    /// Create an empty session answered by `agent`.
    #[must_use]
    pub fn new(id: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        let now = Utc::now();
        let (updates, _) = watch::channel(ConversationSnapshot::default());
        Self {
            inner: Arc::new(SessionInner {
                id: id.into(),
                agent,
                state: RwLock::new(SessionState::default()),
                updates,
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Current conversation state.
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = read(&self.inner.state);
        ConversationSnapshot::new(state.messages.clone(), state.status)
    }

    /// Receive a snapshot after every change.
    ///
    /// Subscribing counts as activity.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.touch();
        self.inner.updates.subscribe()
    }

    /// Options of the most recent request.
    #[must_use]
    pub fn last_options(&self) -> Option<RequestOptions> {
        read(&self.inner.state).last_options.clone()
    }

    /// Error message of the last failed run.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        read(&self.inner.state).last_error.clone()
    }

    /// Get the number of messages in the conversation.
    #[must_use]
    pub fn message_count(&self) -> usize {
        read(&self.inner.state).messages.len()
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *read(&self.inner.last_activity);
        match (Utc::now() - last).to_std() {
            Ok(idle) => idle > timeout,
            // Negative duration means clock skew.
            Err(_) => false,
        }
    }

    /// Mark the session as active now.
    pub fn touch(&self) {
        *write(&self.inner.last_activity) = Utc::now();
    }

    fn publish(&self, state: &SessionState) {
        let snapshot = ConversationSnapshot::new(state.messages.clone(), state.status);
        self.inner.updates.send_replace(snapshot);
    }

    /// Start a new run over the current history.
    fn start_run(&self, options: RequestOptions) {
        let (generation, request) = {
            let mut state = write(&self.inner.state);
            state.generation += 1;
            state.status = ChatStatus::Submitted;
            state.last_error = None;
            state.last_options = Some(options.clone());
            self.publish(&state);
            (
                state.generation,
                AgentRequest {
                    messages: state.messages.clone(),
                    options,
                },
            )
        };
        self.touch();

        let session = self.clone();
        tokio::spawn(async move {
            session.drive(generation, request).await;
        });
    }

    async fn drive(&self, generation: u64, request: AgentRequest) {
        tracing::info!(
            name: "agent.run.started",
            session_id = %self.id(),
            generation,
            model = %request.options.model,
            "Agent run started"
        );

        let mut events = match self.inner.agent.run(request).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(
                    name: "agent.run.failed",
                    session_id = %self.id(),
                    error = %e,
                    "Agent failed to start"
                );
                self.apply(
                    generation,
                    AgentEvent::Error {
                        message: ChatError::Agent(e.to_string()).to_string(),
                    },
                );
                return;
            }
        };

        while let Some(event) = events.next().await {
            if !self.apply(generation, event) {
                return;
            }
        }

        // Stream ended without a finish event.
        self.apply(generation, AgentEvent::Finish);
    }

    /// Fold one event into the conversation. Returns `false` once the run is
    /// over or has been superseded.
    pub(crate) fn apply(&self, generation: u64, event: AgentEvent) -> bool {
        let mut state = write(&self.inner.state);
        if state.generation != generation {
            tracing::debug!(
                session_id = %self.id(),
                generation,
                current = state.generation,
                "Dropping event from superseded run"
            );
            return false;
        }

        tracing::trace!(session_id = %self.id(), event = event.name(), "Applying agent event");
        self.touch();

        let running = match event {
            AgentEvent::Start { message_id } => {
                state
                    .messages
                    .push(Message::with_id(message_id, Role::Assistant, Vec::new()));
                true
            }
            AgentEvent::TextDelta { text } => {
                append_text(reply(&mut state), &text, false);
                state.status = ChatStatus::Streaming;
                true
            }
            AgentEvent::ReasoningDelta { text } => {
                append_text(reply(&mut state), &text, true);
                state.status = ChatStatus::Streaming;
                true
            }
            AgentEvent::Source { url } => {
                reply(&mut state).parts.push(Part::source_url(url));
                state.status = ChatStatus::Streaming;
                true
            }
            AgentEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => {
                reply(&mut state)
                    .parts
                    .push(Part::Tool(ToolPart::new(tool_name, tool_call_id, input)));
                state.status = ChatStatus::Streaming;
                true
            }
            AgentEvent::ToolOutput {
                tool_call_id,
                output,
            } => {
                match reply(&mut state).tool_mut(&tool_call_id) {
                    Some(tool) => tool.complete(output),
                    None => tracing::warn!(tool_call_id = %tool_call_id, "Output for unknown tool call"),
                }
                true
            }
            AgentEvent::ToolError {
                tool_call_id,
                error_text,
            } => {
                match reply(&mut state).tool_mut(&tool_call_id) {
                    Some(tool) => tool.fail(error_text),
                    None => tracing::warn!(tool_call_id = %tool_call_id, "Error for unknown tool call"),
                }
                true
            }
            AgentEvent::Error { message } => {
                tracing::error!(
                    name: "agent.run.error",
                    session_id = %self.id(),
                    error = %message,
                    "Agent run failed"
                );
                state.status = ChatStatus::Error;
                state.last_error = Some(message);
                false
            }
            AgentEvent::Finish => {
                state.status = ChatStatus::Idle;
                tracing::info!(
                    name: "agent.run.finished",
                    session_id = %self.id(),
                    generation,
                    message_count = state.messages.len(),
                    "Agent run finished"
                );
                false
            }
        };

        self.publish(&state);
        running
    }
}

/// The assistant message being generated, created on first use.
fn reply(state: &mut SessionState) -> &mut Message {
    if state.messages.last().is_none_or(|m| m.role != Role::Assistant) {
        state
            .messages
            .push(Message::new(Role::Assistant, Vec::new()));
    }
    let last = state.messages.len() - 1;
    &mut state.messages[last]
}

/// Append to the trailing text or reasoning part, or start a new one.
fn append_text(message: &mut Message, delta: &str, reasoning: bool) {
    match (message.parts.last_mut(), reasoning) {
        (Some(Part::Text { text }), false) | (Some(Part::Reasoning { text }), true) => {
            text.push_str(delta);
        }
        (_, false) => message.parts.push(Part::text(delta)),
        (_, true) => message.parts.push(Part::reasoning(delta)),
    }
}

#[async_trait]
impl ChatBackend for ChatSession {
    async fn send_message(&self, message: SendMessage, options: RequestOptions) -> Result<()> {
        {
            let mut state = write(&self.inner.state);
            let mut parts: Vec<Part> = message.files.into_iter().map(Part::File).collect();
            parts.push(Part::text(message.text));
            state.messages.push(Message::new(Role::User, parts));
        }
        tracing::debug!(
            session_id = %self.id(),
            message_count = self.message_count(),
            "Added user message to session"
        );
        self.start_run(options);
        Ok(())
    }

    async fn regenerate(&self) -> Result<()> {
        let options = {
            let mut state = write(&self.inner.state);
            if state.messages.last().is_some_and(|m| m.role == Role::Assistant) {
                state.messages.pop();
            }
            if !state.messages.iter().any(|m| m.role == Role::User) {
                return Err(ChatError::NothingToRegenerate);
            }
            // Any run still in flight is superseded by the bump in start_run.
            state.last_options.clone().ok_or(ChatError::NothingToRegenerate)?
        };

        tracing::info!(name: "chat.regenerate", session_id = %self.id(), "Regenerating last reply");
        self.start_run(options);
        Ok(())
    }
}

/// Thread-safe store for sessions.
///
/// Provides methods for creating, retrieving, and cleaning up sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    agent: Arc<dyn Agent>,
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl SessionStore {
    /// Create a new session store whose sessions are answered by `agent`.
    #[must_use]
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                agent,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create a new session and return it.
    #[must_use]
    pub fn create(&self) -> ChatSession {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create a new session with a specific ID.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> ChatSession {
        let session = ChatSession::new(id, Arc::clone(&self.inner.agent));
        write(&self.inner.sessions).insert(session.id().to_string(), session.clone());
        tracing::info!(name: "session.created", session_id = %session.id(), "Session created");
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatSession> {
        read(&self.inner.sessions).get(id).cloned()
    }

    /// Get a session by ID for use, or fail with
    /// [`ChatError::SessionNotFound`]. Refreshes its activity time.
    pub fn require(&self, id: &str) -> Result<ChatSession> {
        let session = self
            .get(id)
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Get a session by ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> ChatSession {
        if let Some(session) = self.get(id) {
            session.touch();
            return session;
        }
        self.create_with_id(id)
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<ChatSession> {
        write(&self.inner.sessions).remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.inner.sessions).len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = write(&self.inner.sessions);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    /// List all session IDs.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = read(&self.inner.sessions).keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentStream, LocalAgent, ToolSet};
    use crate::render::{Block, render_conversation};
    use futures::stream;

    /// Agent that replays a fixed event list.
    #[derive(Debug)]
    struct Scripted(Vec<AgentEvent>);

    #[async_trait]
    impl Agent for Scripted {
        async fn run(&self, _request: AgentRequest) -> anyhow::Result<AgentStream> {
            Ok(Box::pin(stream::iter(self.0.clone())))
        }
    }

    fn options() -> RequestOptions {
        RequestOptions {
            model: "openai/gpt-5-nano".to_string(),
            web_search: false,
        }
    }

    fn text(s: &str) -> SendMessage {
        SendMessage {
            text: s.to_string(),
            files: Vec::new(),
        }
    }

    async fn settle(session: &ChatSession) -> ConversationSnapshot {
        let mut rx = session.subscribe();
        let snapshot = rx
            .wait_for(|s| !s.status().is_busy())
            .await
            .expect("session dropped");
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_send_message_runs_agent_to_completion() {
        let agent = Arc::new(LocalAgent::new(ToolSet::with_defaults()));
        let session = ChatSession::new("s1", agent);

        session.send_message(text("add 2 and 5"), options()).await.unwrap();
        let snapshot = settle(&session).await;

        assert_eq!(snapshot.status(), ChatStatus::Idle);
        assert_eq!(snapshot.messages().len(), 2);
        let reply = &snapshot.messages()[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.text(), "The secret calculation of 2 and 5 is 7.");
        assert!(reply.parts.iter().any(|p| matches!(
            p,
            Part::Tool(t) if t.state == crate::conversation::ToolState::OutputAvailable
        )));
        assert_eq!(session.last_options(), Some(options()));
    }

    #[tokio::test]
    async fn test_status_moves_from_submitted_to_streaming() {
        let session = ChatSession::new("s", Arc::new(Scripted(Vec::new())));
        {
            let mut state = write(&session.inner.state);
            state.generation = 1;
        }

        assert!(session.apply(1, AgentEvent::Start { message_id: "a".into() }));
        assert_eq!(session.snapshot().status(), ChatStatus::Idle);

        write(&session.inner.state).status = ChatStatus::Submitted;
        assert!(session.apply(1, AgentEvent::ReasoningDelta { text: "hm".into() }));
        assert_eq!(session.snapshot().status(), ChatStatus::Streaming);

        assert!(session.apply(1, AgentEvent::ReasoningDelta { text: "m".into() }));
        assert!(session.apply(1, AgentEvent::TextDelta { text: "hi".into() }));
        assert!(!session.apply(1, AgentEvent::Finish));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status(), ChatStatus::Idle);
        assert_eq!(
            snapshot.messages()[0].parts,
            vec![Part::reasoning("hmm"), Part::text("hi")]
        );
    }

    #[tokio::test]
    async fn test_reasoning_is_streaming_tail_until_finished() {
        let session = ChatSession::new("s", Arc::new(Scripted(Vec::new())));
        write(&session.inner.state).generation = 3;

        session.apply(3, AgentEvent::Start { message_id: "a".into() });
        session.apply(3, AgentEvent::ReasoningDelta { text: "thinking".into() });
        let view = render_conversation(&session.snapshot());
        assert!(matches!(
            view.messages[0].blocks[0],
            Block::Reasoning { streaming: true, .. }
        ));

        session.apply(3, AgentEvent::Finish);
        let view = render_conversation(&session.snapshot());
        assert!(matches!(
            view.messages[0].blocks[0],
            Block::Reasoning { streaming: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_superseded_events_are_dropped() {
        let session = ChatSession::new("s", Arc::new(Scripted(Vec::new())));
        write(&session.inner.state).generation = 2;

        assert!(!session.apply(1, AgentEvent::TextDelta { text: "late".into() }));
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_agent_error_sets_error_status() {
        let agent = Arc::new(Scripted(vec![
            AgentEvent::Start { message_id: "a".into() },
            AgentEvent::Error {
                message: "upstream unavailable".into(),
            },
        ]));
        let session = ChatSession::new("s", agent);

        session.send_message(text("hi"), options()).await.unwrap();
        let snapshot = settle(&session).await;

        assert_eq!(snapshot.status(), ChatStatus::Error);
        assert_eq!(session.last_error().as_deref(), Some("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_regenerate_replaces_last_reply() {
        let agent = Arc::new(Scripted(vec![
            AgentEvent::Start { message_id: "reply".into() },
            AgentEvent::TextDelta { text: "again".into() },
            AgentEvent::Finish,
        ]));
        let session = ChatSession::new("s", agent);

        session.send_message(text("hi"), options()).await.unwrap();
        settle(&session).await;
        session.regenerate().await.unwrap();
        let snapshot = settle(&session).await;

        assert_eq!(snapshot.messages().len(), 2);
        assert_eq!(snapshot.messages()[1].text(), "again");
    }

    #[tokio::test]
    async fn test_regenerate_without_history_fails() {
        let session = ChatSession::new("s", Arc::new(Scripted(Vec::new())));
        let err = session.regenerate().await.unwrap_err();
        assert!(matches!(err, ChatError::NothingToRegenerate));
    }

    #[test]
    fn test_session_store() {
        let store = SessionStore::new(Arc::new(LocalAgent::default()));
        assert!(store.is_empty());

        let session = store.create();
        assert_eq!(store.len(), 1);

        let retrieved = store.get(session.id()).unwrap();
        assert_eq!(retrieved.id(), session.id());
        assert!(store.require("missing").is_err());

        store.remove(session.id());
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = SessionStore::new(Arc::new(LocalAgent::default()));
        let _ = store.create();
        assert_eq!(store.cleanup_expired_with_timeout(DEFAULT_SESSION_TIMEOUT), 0);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::ZERO), 1);
    }

    fn idle_for(session: &ChatSession, minutes: i64) {
        *write(&session.inner.last_activity) = Utc::now() - chrono::Duration::minutes(minutes);
    }

    #[test]
    fn test_used_sessions_survive_cleanup() {
        let store = SessionStore::new(Arc::new(LocalAgent::default()));
        let timeout = Duration::from_secs(5 * 60);

        let viewed = store.create_with_id("viewed");
        let reopened = store.create_with_id("reopened");
        let watched = store.create_with_id("watched");
        let abandoned = store.create_with_id("abandoned");
        for session in [&viewed, &reopened, &watched, &abandoned] {
            idle_for(session, 10);
        }

        store.require("viewed").unwrap();
        let _ = store.get_or_create("reopened");
        let _rx = watched.subscribe();

        assert_eq!(store.cleanup_expired_with_timeout(timeout), 1);
        assert_eq!(store.list_ids(), vec!["reopened", "viewed", "watched"]);
    }

    #[tokio::test]
    async fn test_agent_events_keep_session_alive() {
        let session = ChatSession::new("s", Arc::new(Scripted(Vec::new())));
        write(&session.inner.state).generation = 1;
        idle_for(&session, 10);
        assert!(session.is_expired_with_timeout(Duration::from_secs(60)));

        session.apply(1, AgentEvent::TextDelta { text: "still here".into() });
        assert!(!session.is_expired_with_timeout(Duration::from_secs(60)));

        // Events from a superseded run do not count.
        idle_for(&session, 10);
        session.apply(0, AgentEvent::TextDelta { text: "late".into() });
        assert!(session.is_expired_with_timeout(Duration::from_secs(60)));
    }
}
