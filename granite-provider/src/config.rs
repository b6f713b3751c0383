//! Configuration for the Granite client.

use std::time::Duration;

use granite_context::conversation::{DEFAULT_HISTORY_OFFSET, DEFAULT_MAX_TOKENS};

use crate::types::Model;

/// Default endpoint base URL.
pub const DEFAULT_BASE_URL: &str = "https://d18n68ssusgr7r.cloudfront.net";

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Static configuration for a [`Granite`](crate::Granite) client.
///
/// Builder setters on the client override individual fields after
/// construction.
#[derive(Debug, Clone)]
pub struct GraniteConfig {
    /// Model to request.
    pub model: Model,

    /// System message sent ahead of every prompt.
    pub system_prompt: String,

    /// Whether prompts carry the conversation transcript.
    pub is_conversation: bool,

    /// Tokens reserved for the reply when sizing the transcript.
    pub max_tokens: u32,

    /// Per-request timeout, covering connect and body read.
    pub timeout: Duration,

    /// Maximum transcript size in characters before trimming.
    pub history_offset: usize,

    /// Replacement for the default conversation preamble.
    pub intro: Option<String>,

    /// Endpoint base URL.
    pub base_url: String,
}

impl Default for GraniteConfig {
    fn default() -> Self {
        Self {
            model: Model::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            is_conversation: true,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            history_offset: DEFAULT_HISTORY_OFFSET,
            intro: None,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}
