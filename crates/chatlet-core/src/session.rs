//! Widget session state machine.
//!
//! One `WidgetSession` owns everything the original widget kept in
//! module-level globals: open/closed state, the conversation history, the
//! in-flight guard, and the server-issued conversation id. Mutating methods
//! return `SessionEffect` values describing the I/O the runtime should
//! perform; the session itself never touches the network, which keeps every
//! state transition unit-testable.

use crate::client::{AgentInfo, ChatError, StreamFrame};

/// Fallback shown when the backend reports a failure mid-stream.
pub const FALLBACK_GENERIC: &str = "Sorry, something went wrong. Please try again.";

/// Fallback shown when the backend could not be reached at all.
pub const FALLBACK_CONNECTION: &str =
    "Sorry, I couldn't reach the assistant. Please check your connection and try again.";

/// Header text used until (or in case) agent metadata arrives.
pub const DEFAULT_HEADER_TITLE: &str = "Chat";

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// I/O the runtime should perform after a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Move keyboard focus to the input field.
    FocusInput,
    /// Fetch agent metadata (name, welcome message). Emitted at most once
    /// per session; a failed fetch is swallowed and defaults remain.
    FetchAgentMeta,
    /// Issue the message send for an accepted submission.
    SendMessage {
        text: String,
        conversation_id: Option<String>,
    },
}

/// Session lifecycle and visual state for one widget instance.
#[derive(Debug, Default)]
pub struct WidgetSession {
    open: bool,
    in_flight: bool,
    typing: bool,
    meta_requested: bool,
    agent_name: Option<String>,
    conversation_id: Option<String>,
    messages: Vec<Message>,
    /// Accumulated assistant text for the turn in flight.
    reply: String,
}

impl WidgetSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// True while a reply is being awaited or streamed (typing indicator).
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Header text: the agent's name once metadata arrived, a default otherwise.
    pub fn header_title(&self) -> &str {
        self.agent_name.as_deref().unwrap_or(DEFAULT_HEADER_TITLE)
    }

    /// Partial reply text streamed so far for the turn in flight.
    pub fn pending_reply(&self) -> &str {
        &self.reply
    }

    /// Flips the widget open or closed.
    ///
    /// Opening focuses the input; the first open additionally triggers the
    /// one-time agent metadata fetch.
    pub fn toggle(&mut self) -> Vec<SessionEffect> {
        self.open = !self.open;
        if !self.open {
            return Vec::new();
        }

        let mut effects = vec![SessionEffect::FocusInput];
        if !self.meta_requested {
            self.meta_requested = true;
            effects.push(SessionEffect::FetchAgentMeta);
        }
        effects
    }

    /// Applies fetched agent metadata, appending the welcome message if any.
    pub fn apply_agent_meta(&mut self, info: AgentInfo) {
        self.agent_name = Some(info.name);
        if let Some(welcome) = info.welcome_message
            && !welcome.trim().is_empty()
        {
            self.messages.push(Message::assistant(welcome));
        }
    }

    /// Accepts a user submission, or rejects it.
    ///
    /// Empty/whitespace-only text and submissions while a send is in flight
    /// are dropped (not queued). On accept the user message is appended
    /// immediately and the send effect is returned.
    pub fn submit(&mut self, text: &str) -> Option<SessionEffect> {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.in_flight {
            return None;
        }

        self.messages.push(Message::user(trimmed));
        self.in_flight = true;
        self.typing = true;
        self.reply.clear();

        Some(SessionEffect::SendMessage {
            text: trimmed.to_string(),
            conversation_id: self.conversation_id.clone(),
        })
    }

    /// Consumes one decoded frame for the turn in flight.
    ///
    /// Frames arriving after the turn has concluded (late `Done` after an
    /// error, duplicate failure paths) are ignored, so each turn reaches
    /// exactly one outcome.
    pub fn apply_frame(&mut self, frame: StreamFrame) {
        if !self.in_flight {
            return;
        }

        match frame {
            StreamFrame::Meta { conversation_id } => {
                // First meta wins; the id is immutable for the session.
                if self.conversation_id.is_none() {
                    self.conversation_id = Some(conversation_id);
                }
            }
            StreamFrame::Token { text } => self.reply.push_str(&text),
            StreamFrame::Error { message } => {
                tracing::debug!("stream error frame: {message}");
                self.conclude_error(FALLBACK_GENERIC);
            }
            StreamFrame::Done => self.conclude_success(),
        }
    }

    /// Records a transport-level failure (request error, mid-read drop).
    ///
    /// Idempotent with `apply_frame` conclusions: whichever failure path
    /// fires first wins, and exactly one fallback message is appended.
    pub fn fail_turn(&mut self, err: &ChatError) {
        if !self.in_flight {
            return;
        }
        tracing::debug!("send failed ({}): {}", err.kind, err.message);
        let fallback = if err.is_connection_failure() {
            FALLBACK_CONNECTION
        } else {
            FALLBACK_GENERIC
        };
        self.conclude_error(fallback);
    }

    fn conclude_success(&mut self) {
        self.in_flight = false;
        self.typing = false;
        let reply = std::mem::take(&mut self.reply);
        if reply.is_empty() {
            // Zero tokens with no error frame: treated as success, nothing
            // surfaced. The user can simply resend.
            tracing::debug!("stream completed without tokens");
        } else {
            self.messages.push(Message::assistant(reply));
        }
    }

    fn conclude_error(&mut self, fallback: &str) {
        self.in_flight = false;
        self.typing = false;
        // Partial text already shown is kept, as its own message; the
        // fallback is appended separately.
        let partial = std::mem::take(&mut self.reply);
        if !partial.is_empty() {
            self.messages.push(Message::assistant(partial));
        }
        self.messages.push(Message::assistant(fallback));
    }
}

#[cfg(test)]
mod tests {
    use crate::client::ChatErrorKind;

    use super::*;

    fn send_effect(session: &mut WidgetSession, text: &str) -> SessionEffect {
        session.submit(text).expect("submission accepted")
    }

    #[test]
    fn submit_appends_exactly_one_user_message_before_network() {
        let mut session = WidgetSession::new();
        let effect = send_effect(&mut session, "  hello  ");

        assert_eq!(session.messages(), &[Message::user("hello")]);
        assert_eq!(
            effect,
            SessionEffect::SendMessage {
                text: "hello".to_string(),
                conversation_id: None,
            }
        );
        assert!(session.is_in_flight());
        assert!(session.is_typing());
    }

    #[test]
    fn submit_rejects_empty_and_whitespace() {
        let mut session = WidgetSession::new();
        assert!(session.submit("").is_none());
        assert!(session.submit("   \n\t").is_none());
        assert!(session.messages().is_empty());
        assert!(!session.is_in_flight());
    }

    #[test]
    fn submit_while_in_flight_is_a_noop() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "first");

        assert!(session.submit("second").is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn streamed_tokens_accumulate_and_commit_on_done() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "hi");

        session.apply_frame(StreamFrame::Meta {
            conversation_id: "id1".to_string(),
        });
        session.apply_frame(StreamFrame::Token {
            text: "Hel".to_string(),
        });
        session.apply_frame(StreamFrame::Token {
            text: "lo".to_string(),
        });
        session.apply_frame(StreamFrame::Done);

        assert_eq!(session.conversation_id(), Some("id1"));
        assert_eq!(session.messages().last(), Some(&Message::assistant("Hello")));
        assert!(!session.is_in_flight());
        assert!(!session.is_typing());
    }

    #[test]
    fn conversation_id_is_immutable_once_set() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "hi");
        session.apply_frame(StreamFrame::Meta {
            conversation_id: "id1".to_string(),
        });
        session.apply_frame(StreamFrame::Meta {
            conversation_id: "id2".to_string(),
        });
        session.apply_frame(StreamFrame::Done);

        assert_eq!(session.conversation_id(), Some("id1"));

        // Subsequent sends carry the adopted id.
        let effect = send_effect(&mut session, "again");
        assert_eq!(
            effect,
            SessionEffect::SendMessage {
                text: "again".to_string(),
                conversation_id: Some("id1".to_string()),
            }
        );
    }

    #[test]
    fn error_frame_keeps_partial_and_appends_one_fallback() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "hi");

        session.apply_frame(StreamFrame::Token {
            text: "partial ans".to_string(),
        });
        session.apply_frame(StreamFrame::Error {
            message: "overloaded".to_string(),
        });
        // Natural stream end after the error frame must not double-commit.
        session.apply_frame(StreamFrame::Done);

        assert_eq!(
            session.messages(),
            &[
                Message::user("hi"),
                Message::assistant("partial ans"),
                Message::assistant(FALLBACK_GENERIC),
            ]
        );
        assert!(!session.is_in_flight());
    }

    #[test]
    fn transport_failure_appends_exactly_one_fallback() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "hi");

        let err = ChatError::new(ChatErrorKind::Transport, "Connection failed");
        // Both the read loop's catch and the outer catch may fire.
        session.fail_turn(&err);
        session.fail_turn(&err);
        session.apply_frame(StreamFrame::Done);

        assert_eq!(
            session.messages(),
            &[
                Message::user("hi"),
                Message::assistant(FALLBACK_CONNECTION),
            ]
        );
        assert!(!session.is_in_flight());

        // In-flight flag cleared: a retry is accepted.
        assert!(session.submit("retry").is_some());
    }

    #[test]
    fn http_error_clears_in_flight_for_retry() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "hi");

        session.fail_turn(&ChatError::http_status(500, "{\"error\":\"rate limited\"}"));

        assert_eq!(session.messages().len(), 2);
        assert_eq!(
            session.messages().last(),
            Some(&Message::assistant(FALLBACK_CONNECTION))
        );
        assert!(!session.is_in_flight());
        assert!(session.submit("retry").is_some());
    }

    #[test]
    fn empty_completion_commits_nothing() {
        let mut session = WidgetSession::new();
        send_effect(&mut session, "hi");

        session.apply_frame(StreamFrame::Done);

        assert_eq!(session.messages(), &[Message::user("hi")]);
        assert!(!session.is_in_flight());
    }

    #[test]
    fn toggle_twice_restores_state_and_conversation() {
        let mut session = WidgetSession::new();
        let before = session.messages().to_vec();

        let opened = session.toggle();
        assert!(session.is_open());
        assert!(opened.contains(&SessionEffect::FocusInput));
        assert!(opened.contains(&SessionEffect::FetchAgentMeta));

        let closed = session.toggle();
        assert!(!session.is_open());
        assert!(closed.is_empty());
        assert_eq!(session.messages(), before.as_slice());
    }

    #[test]
    fn metadata_fetch_happens_only_on_first_open() {
        let mut session = WidgetSession::new();
        session.toggle();
        session.toggle();

        let reopened = session.toggle();
        assert_eq!(reopened, vec![SessionEffect::FocusInput]);
    }

    #[test]
    fn agent_meta_sets_header_and_welcome() {
        let mut session = WidgetSession::new();
        assert_eq!(session.header_title(), DEFAULT_HEADER_TITLE);

        session.apply_agent_meta(AgentInfo {
            name: "Acme Support".to_string(),
            welcome_message: Some("Hi there!".to_string()),
        });

        assert_eq!(session.header_title(), "Acme Support");
        assert_eq!(session.messages(), &[Message::assistant("Hi there!")]);
    }

    #[test]
    fn agent_meta_without_welcome_adds_no_message() {
        let mut session = WidgetSession::new();
        session.apply_agent_meta(AgentInfo {
            name: "Acme".to_string(),
            welcome_message: None,
        });
        assert!(session.messages().is_empty());
    }
}
