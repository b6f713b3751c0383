//! In-memory conversation history.
//!
//! The history is kept as a single transcript string. Each exchange is
//! appended as `"\nUser : {prompt}\nLLM :{response}"` and the whole
//! transcript is prepended to the next prompt, trimmed from the front once
//! it outgrows the configured offset.

/// Default preamble placed before the transcript.
pub const DEFAULT_INTRO: &str = "You're a Large Language Model for chatting with people. \
Assume role of the LLM and give your response.";

/// Default maximum transcript size, in characters.
pub const DEFAULT_HISTORY_OFFSET: usize = 10250;

/// Default number of tokens reserved for the model's reply.
pub const DEFAULT_MAX_TOKENS: u32 = 600;

/// Extra characters dropped when trimming so the new prompt fits.
const PROMPT_ALLOWANCE: usize = 10;

/// Marker placed where trimmed history used to be.
const TRIM_MARKER: &str = "... ";

/// Conversation state for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    enabled: bool,
    max_tokens: u32,
    intro: String,
    history_offset: usize,
    history: String,
}

impl Conversation {
    /// Create an enabled conversation with default settings.
    pub fn new() -> Self {
        Self {
            enabled: true,
            max_tokens: DEFAULT_MAX_TOKENS,
            intro: DEFAULT_INTRO.into(),
            history_offset: DEFAULT_HISTORY_OFFSET,
            history: String::new(),
        }
    }

    /// A conversation that never records history and passes prompts through.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Enable or disable history tracking.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the number of tokens reserved for the reply.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the preamble.
    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = intro.into();
        self
    }

    /// Set the maximum transcript size before trimming kicks in.
    pub fn with_history_offset(mut self, offset: usize) -> Self {
        self.history_offset = offset;
        self
    }

    /// Whether history is being tracked.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Tokens reserved for the reply.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// The preamble.
    pub fn intro(&self) -> &str {
        &self.intro
    }

    /// The recorded transcript, without the preamble.
    pub fn history(&self) -> &str {
        &self.history
    }

    /// Forget every recorded exchange.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Build the text sent to the model for `prompt`.
    ///
    /// When disabled, returns `prompt` unchanged.
    pub fn gen_complete_prompt(&self, prompt: &str) -> String {
        if !self.enabled {
            return prompt.to_string();
        }
        let mut pending = self.history.clone();
        pending.push_str(&format_exchange(prompt, ""));
        let trimmed = self.trim(&pending);
        format!("{}{}", self.intro, trimmed)
    }

    /// Record one finished exchange. No-op when disabled.
    pub fn update_chat_history(&mut self, prompt: &str, response: &str) {
        if !self.enabled {
            return;
        }
        self.history.push_str(&format_exchange(prompt, response));
    }

    fn trim(&self, transcript: &str) -> String {
        let total = self.max_tokens as usize
            + self.intro.chars().count()
            + transcript.chars().count();
        if total <= self.history_offset {
            return transcript.to_string();
        }

        let drop = total - self.history_offset + PROMPT_ALLOWANCE;
        tracing::debug!(dropped_chars = drop, "trimming conversation history");
        let kept = match transcript.char_indices().nth(drop) {
            Some((at, _)) => &transcript[at..],
            None => "",
        };
        format!("{TRIM_MARKER}{kept}")
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

fn format_exchange(prompt: &str, response: &str) -> String {
    format!("\nUser : {prompt}\nLLM :{response}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_prompt_has_intro_and_open_turn() {
        let conversation = Conversation::new().with_intro("Intro.");
        assert_eq!(
            conversation.gen_complete_prompt("hi"),
            "Intro.\nUser : hi\nLLM :"
        );
    }

    #[test]
    fn history_is_replayed_in_next_prompt() {
        let mut conversation = Conversation::new().with_intro("Intro.");
        conversation.update_chat_history("hi", "hello there");

        assert_eq!(conversation.history(), "\nUser : hi\nLLM :hello there");
        assert_eq!(
            conversation.gen_complete_prompt("how are you?"),
            "Intro.\nUser : hi\nLLM :hello there\nUser : how are you?\nLLM :"
        );
    }

    #[test]
    fn disabled_conversation_passes_prompt_through() {
        let mut conversation = Conversation::disabled();
        conversation.update_chat_history("hi", "hello");

        assert!(conversation.history().is_empty());
        assert_eq!(conversation.gen_complete_prompt("plain"), "plain");
    }

    #[test]
    fn long_history_is_trimmed_from_the_front() {
        let mut conversation = Conversation::new()
            .with_intro("")
            .with_max_tokens(0)
            .with_history_offset(40);
        conversation.update_chat_history("first question", "first answer");
        conversation.update_chat_history("second", "reply");

        let prompt = conversation.gen_complete_prompt("next");
        assert!(prompt.starts_with(TRIM_MARKER), "got: {prompt}");
        assert!(prompt.ends_with("\nUser : next\nLLM :"), "got: {prompt}");
        assert!(!prompt.contains("first question"));
        // Trimmed body is offset minus the allowance.
        let body = prompt.trim_start_matches(TRIM_MARKER);
        assert_eq!(body.chars().count(), 40 - PROMPT_ALLOWANCE);
    }

    #[test]
    fn trimming_respects_char_boundaries() {
        let mut conversation = Conversation::new()
            .with_intro("")
            .with_max_tokens(0)
            .with_history_offset(30);
        conversation.update_chat_history("héllo wörld ünïcode", "ääääääääää");

        let prompt = conversation.gen_complete_prompt("ö");
        assert!(prompt.starts_with(TRIM_MARKER));
        assert!(prompt.ends_with("\nUser : ö\nLLM :"));
    }

    #[test]
    fn max_tokens_counts_against_offset() {
        let conversation = Conversation::new()
            .with_intro("")
            .with_max_tokens(100)
            .with_history_offset(50);
        let prompt = conversation.gen_complete_prompt("q");
        // The reservation alone exceeds the offset, so everything is dropped.
        assert_eq!(prompt, TRIM_MARKER);
    }

    #[test]
    fn clear_forgets_history() {
        let mut conversation = Conversation::new();
        conversation.update_chat_history("a", "b");
        conversation.clear();
        assert!(conversation.history().is_empty());
    }

    #[test]
    fn defaults() {
        let conversation = Conversation::default();
        assert!(conversation.is_enabled());
        assert_eq!(conversation.max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(conversation.intro(), DEFAULT_INTRO);
    }
}
