//! Granite `/v1/chat/completions` wire types.
//!
//! The request body follows the OpenAI chat shape. The streamed response is
//! not: each line is a two-element JSON array whose first element is the
//! frame code `3` and whose second element is a text fragment.
//!
//! ```text
//! [3,"Hello"]
//! [3," world"]
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GraniteError;

/// Frame code marking a text fragment line.
pub(crate) const TEXT_FRAME: i64 = 3;

/// Models served by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Model {
    /// `granite-3-8b-instruct`
    #[default]
    #[serde(rename = "granite-3-8b-instruct")]
    Granite3_8bInstruct,
}

impl Model {
    /// Every model the endpoint accepts.
    pub const ALL: [Model; 1] = [Model::Granite3_8bInstruct];

    /// Identifier sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Model::Granite3_8bInstruct => "granite-3-8b-instruct",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = GraniteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| GraniteError::InvalidModel(s.to_string()))
    }
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
pub struct GraniteRequest {
    /// Model identifier.
    pub model: Model,
    /// System message followed by the user message.
    pub messages: Vec<GraniteMessage>,
    /// Whether the caller consumes the reply incrementally.
    pub stream: bool,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraniteMessage {
    /// `"system"` or `"user"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl GraniteMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// One value handed to the caller per text fragment.
///
/// Serializes as a bare string in raw mode and as `{"text": ...}` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Chunk {
    /// Bare fragment text.
    Raw(String),
    /// Fragment wrapped in a single-field record.
    Text {
        /// Fragment text.
        text: String,
    },
}

impl Chunk {
    /// Wrap `text` according to the output mode.
    pub fn new(text: impl Into<String>, raw: bool) -> Self {
        let text = text.into();
        if raw {
            Chunk::Raw(text)
        } else {
            Chunk::Text { text }
        }
    }

    /// The fragment text, whichever shape it is in.
    pub fn text(&self) -> &str {
        match self {
            Chunk::Raw(text) | Chunk::Text { text } => text,
        }
    }

    /// Take the fragment text.
    pub fn into_text(self) -> String {
        match self {
            Chunk::Raw(text) | Chunk::Text { text } => text,
        }
    }
}
