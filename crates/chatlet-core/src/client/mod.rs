//! HTTP client for the chat-agent backend.
//!
//! Two endpoints: a public metadata fetch and the streaming message send.
//! The message response body is decoded incrementally into `StreamFrame`s
//! by the `sse` module.

use std::fmt;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod sse;

pub use sse::{FrameStream, LineDecoder, StreamFrame, parse_data_line};

/// Standard User-Agent header for chatlet API requests.
pub const USER_AGENT: &str = concat!("chatlet/", env!("CARGO_PKG_VERSION"));

/// Categories of client errors for consistent recovery handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Transport failure (connect error, timeout, mid-read drop)
    Transport,
    /// Failed to parse a response
    Parse,
    /// API-level error reported by the backend
    Api,
}

impl fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatErrorKind::HttpStatus => write!(f, "http_status"),
            ChatErrorKind::Transport => write!(f, "transport"),
            ChatErrorKind::Parse => write!(f, "parse"),
            ChatErrorKind::Api => write!(f, "api"),
        }
    }
}

/// Structured client error with kind and details.
#[derive(Debug, Clone)]
pub struct ChatError {
    /// Error category
    pub kind: ChatErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, mining the body's `error` field for a
    /// readable message when the backend sent one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut message = format!("HTTP {status}");
        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json.get("error").and_then(Value::as_str)
        {
            message = format!("HTTP {status}: {msg}");
        }
        Self {
            kind: ChatErrorKind::HttpStatus,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transport, message)
    }

    /// True when the failure warrants the connection-variant fallback:
    /// transport failures, plus non-2xx responses (the backend was
    /// reachable but the exchange did not go through).
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::Transport | ChatErrorKind::HttpStatus
        )
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChatError {}

/// Result type for client operations.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Boxed stream of decoded frames.
pub type ChatFrameStream = BoxStream<'static, ChatResult<StreamFrame>>;

/// Public agent metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub name: String,
    #[serde(default)]
    pub welcome_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    agent: Option<AgentInfo>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    message: &'a str,
    #[serde(rename = "conversationId")]
    conversation_id: Option<&'a str>,
}

/// Chat-agent API client.
pub struct ChatClient {
    api_base: String,
    http: reqwest::Client,
}

impl ChatClient {
    /// Creates a client for the given API base URL.
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            api_base,
            http: reqwest::Client::new(),
        }
    }

    /// Fetches the agent's public metadata (name, optional welcome message).
    ///
    /// # Errors
    /// Returns an error on connection failure, non-2xx status, or an
    /// unusable response body. Callers treat this as non-fatal.
    pub async fn fetch_agent(&self, agent_id: &str) -> ChatResult<AgentInfo> {
        let url = format!("{}/api/chat-agents/{agent_id}", self.api_base);
        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::http_status(status.as_u16(), &body));
        }

        let envelope: AgentEnvelope = response.json().await.map_err(|e| {
            ChatError::new(ChatErrorKind::Parse, format!("Invalid agent metadata: {e}"))
        })?;
        if !envelope.success {
            return Err(ChatError::new(
                ChatErrorKind::Api,
                "Agent lookup unsuccessful",
            ));
        }
        envelope
            .agent
            .ok_or_else(|| ChatError::new(ChatErrorKind::Parse, "Agent metadata missing"))
    }

    /// Sends one user message and returns the frame stream for the reply.
    ///
    /// `conversation_id` is `None` on the first turn; afterwards the caller
    /// passes the id adopted from the first `meta` frame.
    ///
    /// # Errors
    /// Returns an error on connection failure or non-2xx status. Mid-stream
    /// failures surface as `Err` items on the returned stream.
    pub async fn send_message(
        &self,
        agent_id: &str,
        text: &str,
        conversation_id: Option<&str>,
    ) -> ChatResult<ChatFrameStream> {
        let url = format!(
            "{}/api/chat-agents/public/{agent_id}/message",
            self.api_base
        );
        let body = SendMessageBody {
            message: text,
            conversation_id,
        };

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .header("user-agent", USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::http_status(status.as_u16(), &body));
        }

        Ok(FrameStream::new(response.bytes_stream()).boxed())
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::transport(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ChatError::transport(format!("Connection failed: {e}"))
    } else {
        ChatError::new(ChatErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn fetch_agent_parses_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat-agents/agent-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "agent": {"name": "Acme Support", "welcomeMessage": "Hi there!"}
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri());
        let agent = client.fetch_agent("agent-1").await.unwrap();
        assert_eq!(agent.name, "Acme Support");
        assert_eq!(agent.welcome_message.as_deref(), Some("Hi there!"));
    }

    #[tokio::test]
    async fn fetch_agent_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat-agents/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"error\":\"not found\"}"))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri());
        let err = client.fetch_agent("missing").await.unwrap_err();
        assert_eq!(err.kind, ChatErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 404: not found");
    }

    #[tokio::test]
    async fn send_message_posts_body_and_streams_frames() {
        use futures_util::StreamExt;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat-agents/public/agent-1/message"))
            .and(body_json(serde_json::json!({
                "message": "hello",
                "conversationId": "conv-9"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(
                        "data: {\"type\":\"token\",\"token\":\"Hi\"}\n\ndata: [DONE]\n\n",
                    ),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri());
        let mut frames = client
            .send_message("agent-1", "hello", Some("conv-9"))
            .await
            .unwrap();

        let first = frames.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            StreamFrame::Token {
                text: "Hi".to_string()
            }
        );
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn send_message_mines_error_body_on_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat-agents/public/agent-1/message"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string("{\"error\":\"rate limited\"}"),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri());
        let err = client
            .send_message("agent-1", "hello", None)
            .await
            .err()
            .expect("expected error response");
        assert_eq!(err.kind, ChatErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 500: rate limited");
        assert!(err.is_connection_failure());
    }

    #[tokio::test]
    async fn send_message_tolerates_unparseable_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat-agents/public/agent-1/message"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri());
        let err = client
            .send_message("agent-1", "hello", None)
            .await
            .err()
            .expect("expected error response");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("<html>bad gateway</html>"));
    }
}
