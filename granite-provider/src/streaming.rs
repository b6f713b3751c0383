//! Line-oriented streaming support for the Granite chat API.
//!
//! The response body is newline-delimited JSON. Every line that carries
//! generated text is a two-element array `[3, "<fragment>"]`; anything else
//! is ignored. [`ndjson_lines`] splits the body into lines and [`decode`]
//! turns lines into [`Chunk`]s while accumulating the full reply.
//!
//! ```text
//! [3,"Hello"]
//! [3," world"]
//! ```

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;

use crate::error::{BoxError, GraniteError};
use crate::types::{Chunk, TEXT_FRAME};

/// Failure reported by a line source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The underlying transport failed (connection dropped, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Any other fault in the line source.
    #[error("line source error: {0}")]
    Other(#[source] BoxError),
}

impl SourceError {
    /// Wrap a transport fault.
    pub fn transport(cause: impl Into<BoxError>) -> Self {
        SourceError::Transport(cause.into())
    }

    /// Wrap a non-transport fault.
    pub fn other(cause: impl Into<BoxError>) -> Self {
        SourceError::Other(cause.into())
    }
}

impl From<SourceError> for GraniteError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Transport(cause) => GraniteError::ConnectionFailure(cause),
            SourceError::Other(cause) => GraniteError::GenerationFailure(cause),
        }
    }
}

/// Lifecycle of a [`StreamSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No line has been offered yet.
    NotStarted,
    /// At least one line has been offered.
    Streaming,
    /// The line source ended normally and the text was taken.
    Finished,
    /// A fatal error ended the session.
    Failed,
}

/// Why a line produced no fragment.
#[derive(Debug)]
pub enum Skip {
    /// Empty or whitespace-only line.
    Blank,
    /// The line is not JSON.
    InvalidJson(serde_json::Error),
    /// Valid JSON that is not a `[3, "<text>"]` frame.
    Unrecognized,
    /// The session is already finished or failed.
    Closed,
}

/// Result of offering one line to a session.
#[derive(Debug)]
pub enum LineOutcome {
    /// The line carried a text fragment.
    Fragment(Chunk),
    /// The line was ignored.
    Skipped(Skip),
}

/// State of one streaming exchange: the accumulated text and output mode.
#[derive(Debug)]
pub struct StreamSession {
    raw: bool,
    text: String,
    state: SessionState,
}

impl StreamSession {
    /// Start a session. In raw mode fragments are yielded as bare strings.
    pub fn new(raw: bool) -> Self {
        Self {
            raw,
            text: String::new(),
            state: SessionState::NotStarted,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Offer one line.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        match self.state {
            SessionState::Finished | SessionState::Failed => {
                return LineOutcome::Skipped(Skip::Closed);
            }
            SessionState::NotStarted => self.state = SessionState::Streaming,
            SessionState::Streaming => {}
        }

        if line.trim().is_empty() {
            return LineOutcome::Skipped(Skip::Blank);
        }

        let json: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => return LineOutcome::Skipped(Skip::InvalidJson(e)),
        };

        match text_frame(&json) {
            Some(fragment) => {
                self.text.push_str(fragment);
                LineOutcome::Fragment(Chunk::new(fragment, self.raw))
            }
            None => LineOutcome::Skipped(Skip::Unrecognized),
        }
    }

    /// Close the session after the line source ended and take the full text.
    pub fn finish(&mut self) -> String {
        self.state = SessionState::Finished;
        std::mem::take(&mut self.text)
    }

    /// Close the session after a fatal error.
    pub fn fail(&mut self, err: impl Into<GraniteError>) -> GraniteError {
        self.state = SessionState::Failed;
        err.into()
    }
}

/// Extract the fragment from a `[3, "<text>"]` frame.
fn text_frame(json: &Value) -> Option<&str> {
    let Value::Array(items) = json else {
        return None;
    };
    match items.as_slice() {
        [tag, Value::String(text)] if tag.as_i64() == Some(TEXT_FRAME) => Some(text.as_str()),
        _ => None,
    }
}

/// Decode a line stream into chunks.
///
/// Blank, malformed and unrecognized lines are skipped. When `lines` ends
/// normally, `finalize` receives the accumulated text exactly once. It is
/// not called if the source fails or the returned stream is dropped early.
/// Source failures end the stream with [`GraniteError::ConnectionFailure`]
/// (transport) or [`GraniteError::GenerationFailure`] (anything else).
pub fn decode<'a, S, F>(
    lines: S,
    raw: bool,
    finalize: F,
) -> impl Stream<Item = Result<Chunk, GraniteError>> + Send + 'a
where
    S: Stream<Item = Result<String, SourceError>> + Send + 'a,
    F: FnOnce(String) + Send + 'a,
{
    async_stream::try_stream! {
        let mut session = StreamSession::new(raw);
        let mut lines = std::pin::pin!(lines);

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "line source failed");
                    Err(session.fail(e))?
                }
            };

            match session.process_line(&line) {
                LineOutcome::Fragment(chunk) => {
                    yield chunk;
                }
                LineOutcome::Skipped(Skip::InvalidJson(e)) => {
                    tracing::warn!(error = %e, "JSON decode error, skipping line");
                }
                LineOutcome::Skipped(Skip::Unrecognized) => {
                    tracing::debug!(line = %line, "skipping unrecognized line");
                }
                LineOutcome::Skipped(Skip::Blank | Skip::Closed) => {}
            }
        }

        let text = session.finish();
        tracing::info!(chars = text.chars().count(), "stream processing completed");
        finalize(text);
    }
}

/// Fail a byte stream when no chunk arrives within `idle`.
///
/// The wait restarts after every chunk, so a slow but steady body is never
/// cut off. Expiry ends the stream with a transport error.
pub fn idle_timeout<'a, B, E>(
    byte_stream: B,
    idle: Duration,
) -> impl Stream<Item = Result<Bytes, BoxError>> + Send + 'a
where
    B: Stream<Item = Result<Bytes, E>> + Send + 'a,
    E: Into<BoxError> + Send + 'a,
{
    async_stream::try_stream! {
        let mut bytes_stream = std::pin::pin!(byte_stream);
        loop {
            let next = tokio::time::timeout(idle, bytes_stream.next())
                .await
                .map_err(|elapsed| {
                    tracing::error!(idle_ms = idle.as_millis() as u64, "response body stalled");
                    BoxError::from(elapsed)
                })?;
            match next {
                Some(chunk) => {
                    let chunk = chunk.map_err(Into::<BoxError>::into)?;
                    yield chunk;
                }
                None => break,
            }
        }
    }
}

/// Decode one line, replacing invalid UTF-8 with U+FFFD.
fn decode_line(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|err| {
        tracing::warn!(error = %err.utf8_error(), "invalid UTF-8 in line, replacing");
        String::from_utf8_lossy(err.as_bytes()).into_owned()
    })
}

/// Split a response body into lines.
///
/// Partial lines are buffered across chunks, so multi-byte characters split
/// between chunks decode correctly. A trailing `\r` is stripped and a final
/// unterminated line is emitted when the body ends. Blank lines are passed
/// through. Invalid UTF-8 is replaced rather than rejected.
pub fn ndjson_lines<'a, B, E>(
    byte_stream: B,
) -> impl Stream<Item = Result<String, SourceError>> + Send + 'a
where
    B: Stream<Item = Result<Bytes, E>> + Send + 'a,
    E: Into<BoxError> + Send + 'a,
{
    async_stream::try_stream! {
        let mut bytes_stream = std::pin::pin!(byte_stream);
        let mut line_buf: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes_stream.next().await {
            let chunk = chunk.map_err(SourceError::transport)?;
            line_buf.extend_from_slice(&chunk);

            while let Some(newline_pos) = line_buf.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = line_buf.drain(..=newline_pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                yield decode_line(line);
            }
        }

        if !line_buf.is_empty() {
            if line_buf.last() == Some(&b'\r') {
                line_buf.pop();
            }
            yield decode_line(line_buf);
        }
    }
}
