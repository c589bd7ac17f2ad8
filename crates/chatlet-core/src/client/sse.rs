//! Stream frame decoding for the chat-agent message endpoint.
//!
//! The backend delivers an SSE-style body: incremental text where each
//! meaningful line carries a `data: ` prefix followed by a JSON payload.
//! Framing is looser than spec SSE (no `event:` fields, keep-alive comment
//! lines, connection close as the only terminator), so decoding is a small
//! explicit state machine instead of a full SSE parser: buffer bytes, split
//! on newline, hold back the trailing partial segment, parse only complete
//! lines.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::Stream;
use serde::Deserialize;

use crate::client::{ChatError, ChatErrorKind, ChatResult};

const DATA_PREFIX: &str = "data: ";

/// Terminator token some backends emit before closing. Carries no frame;
/// completion is signaled by stream end.
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded unit from the message stream.
///
/// Frames are consumed immediately by the session; they are never stored.
/// `Done` is synthesized by the driver when the underlying read completes;
/// the wire never carries it (`[DONE]` payloads are ignored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Server-issued conversation identifier, sent once per conversation.
    Meta { conversation_id: String },
    /// Text fragment; fragments concatenate in arrival order with no delimiter.
    Token { text: String },
    /// Backend reported a failure mid-stream.
    Error { message: String },
    /// Underlying stream completed.
    Done,
}

/// Wire payloads behind the `data: ` prefix.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireFrame {
    Meta {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    Token {
        token: String,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Incremental line buffer.
///
/// Chunks are appended as raw bytes and complete (newline-terminated) lines
/// are drained out. The trailing segment without a newline stays buffered
/// until a later chunk completes it; since `\n` never occurs inside a
/// multi-byte UTF-8 sequence, split sequences survive chunk boundaries
/// intact.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line completed by it.
    ///
    /// Trailing `\r` is trimmed so CRLF bodies decode the same as LF.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Takes whatever bytes are still buffered.
    ///
    /// An unterminated trailing segment at stream end is never parsed as a
    /// frame; this exists so callers and tests can observe what was held back.
    pub fn take_remainder(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Parses one complete line into a frame.
///
/// Returns `None` for everything that is not a well-formed frame: lines
/// without the `data: ` prefix (keep-alives, comments), the `[DONE]`
/// sentinel, and malformed JSON (partial-frame tolerance).
pub fn parse_data_line(line: &str) -> Option<StreamFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<WireFrame>(payload) {
        Ok(WireFrame::Meta { conversation_id }) => Some(StreamFrame::Meta { conversation_id }),
        Ok(WireFrame::Token { token }) => Some(StreamFrame::Token { text: token }),
        Ok(WireFrame::Error { message, error }) => Some(StreamFrame::Error {
            message: message
                .or(error)
                .unwrap_or_else(|| "Unknown error".to_string()),
        }),
        Err(err) => {
            tracing::debug!("skipping malformed stream line: {err}");
            None
        }
    }
}

/// `Stream` adapter turning a byte stream into `StreamFrame`s.
pub struct FrameStream<S> {
    inner: S,
    decoder: LineDecoder,
    pending: VecDeque<StreamFrame>,
}

impl<S> FrameStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ChatResult<StreamFrame>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        let this = self.get_mut();
        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    for line in this.decoder.push(&chunk) {
                        if let Some(frame) = parse_data_line(&line) {
                            this.pending.push_back(frame);
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ChatError::new(
                        ChatErrorKind::Transport,
                        format!("Stream interrupted: {e}"),
                    ))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
