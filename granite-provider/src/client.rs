//! Granite API client struct and builder.

use std::time::Duration;

use futures::{Stream, StreamExt};
use granite_context::{Conversation, OptimizerSet};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};

use crate::config::GraniteConfig;
use crate::error::{GraniteError, map_http_status, map_reqwest_error};
use crate::streaming::{decode, idle_timeout, ndjson_lines};
use crate::types::{Chunk, GraniteMessage, GraniteRequest, Model};

/// User agent sent when none is configured.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const ORIGIN: &str = "https://www.ibm.com";
const REFERER: &str = "https://www.ibm.com/";
const ACCEPT_TYPES: &str = "application/json,application/jsonl";

/// Number of prompt characters echoed into debug logs.
const PROMPT_PREVIEW_CHARS: usize = 50;

/// Per-call options for [`Granite::ask`] and friends.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Yield bare fragment strings instead of `{text}` records.
    pub raw: bool,
    /// Name of the optimizer to apply to the prompt.
    pub optimizer: Option<String>,
    /// Optimize the full conversation prompt rather than the bare prompt.
    pub conversationally: bool,
}

impl AskOptions {
    /// Set raw output mode.
    #[must_use]
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Apply the named optimizer.
    #[must_use]
    pub fn with_optimizer(mut self, name: impl Into<String>) -> Self {
        self.optimizer = Some(name.into());
        self
    }

    /// Optimize the conversation prompt instead of the bare prompt.
    #[must_use]
    pub fn with_conversationally(mut self, conversationally: bool) -> Self {
        self.conversationally = conversationally;
        self
    }
}

/// Client for the Granite chat completion endpoint.
///
/// Holds the conversation for one chat. Streaming calls borrow the client
/// mutably until the stream is dropped, and record the exchange in the
/// conversation only when the stream runs to completion.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use granite_provider::{AskOptions, Granite};
///
/// # async fn run() -> Result<(), granite_provider::GraniteError> {
/// let mut client = Granite::new("api-key");
/// let mut stream = std::pin::pin!(client.chat_stream("write a poem about AI", AskOptions::default())?);
/// while let Some(text) = stream.next().await {
///     print!("{}", text?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Granite {
    pub(crate) api_key: String,
    pub(crate) model: Model,
    pub(crate) base_url: String,
    pub(crate) system_prompt: String,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
    pub(crate) optimizers: OptimizerSet,
    pub(crate) conversation: Conversation,
    pub(crate) last_response: Option<String>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl Granite {
    /// Create a client with default settings.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_config(api_key, GraniteConfig::default())
    }

    /// Create a client from an explicit configuration.
    #[must_use]
    pub fn from_config(api_key: impl Into<String>, config: GraniteConfig) -> Self {
        tracing::info!(model = %config.model, "initializing Granite client");

        let mut conversation = Conversation::new()
            .with_enabled(config.is_conversation)
            .with_max_tokens(config.max_tokens)
            .with_history_offset(config.history_offset);
        if let Some(intro) = config.intro {
            conversation = conversation.with_intro(intro);
        }

        Self {
            api_key: api_key.into(),
            model: config.model,
            base_url: config.base_url,
            system_prompt: config.system_prompt,
            timeout: config.timeout,
            user_agent: DEFAULT_USER_AGENT.into(),
            optimizers: OptimizerSet::builtin(),
            conversation,
            last_response: None,
            client: reqwest::Client::new(),
        }
    }

    /// Override the endpoint base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the model.
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Override the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Override the idle timeout.
    ///
    /// Bounds the wait for the response headers and for each body chunk,
    /// not the length of the whole reply.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the `user-agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a preconfigured HTTP client, e.g. one routed through a proxy.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Replace the available optimizers.
    #[must_use]
    pub fn with_optimizers(mut self, optimizers: OptimizerSet) -> Self {
        self.optimizers = optimizers;
        self
    }

    /// Replace the conversation.
    #[must_use]
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Mutable access to the conversation.
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Full text of the last exchange that ran to completion.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Build the chat completions endpoint URL.
    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Host part of the base URL, sent as the `authority` header.
    fn authority(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Turn the user prompt into the prompt sent to the model.
    pub(crate) fn prepare_prompt(
        &self,
        prompt: &str,
        options: &AskOptions,
    ) -> Result<String, GraniteError> {
        let conversation_prompt = self.conversation.gen_complete_prompt(prompt);
        let Some(name) = options.optimizer.as_deref() else {
            return Ok(conversation_prompt);
        };

        let input = if options.conversationally {
            conversation_prompt.as_str()
        } else {
            prompt
        };
        let optimized = self.optimizers.apply(name, input).inspect_err(|e| {
            tracing::error!(optimizer = %name, "{e}");
        })?;
        tracing::debug!(optimizer = %name, "applied optimizer");
        Ok(optimized)
    }

    pub(crate) fn build_request(
        &self,
        prompt: &str,
        options: &AskOptions,
        stream: bool,
    ) -> Result<GraniteRequest, GraniteError> {
        let content = self.prepare_prompt(prompt, options)?;
        Ok(GraniteRequest {
            model: self.model,
            messages: vec![
                GraniteMessage::system(self.system_prompt.clone()),
                GraniteMessage::user(content),
            ],
            stream,
        })
    }

    /// Send one exchange and decode the reply.
    ///
    /// The request goes out when the stream is first polled.
    fn exchange(
        &mut self,
        prompt: &str,
        options: AskOptions,
        stream: bool,
    ) -> Result<impl Stream<Item = Result<Chunk, GraniteError>> + Send + '_, GraniteError> {
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        tracing::debug!(prompt = %preview, stream, "ask initiated");

        let body = self.build_request(prompt, &options, stream)?;
        let url = self.completions_url();
        let model = body.model;
        let http_request = self
            .client
            .post(&url)
            .header("authority", self.authority())
            .header(ACCEPT, ACCEPT_TYPES)
            .header(CONTENT_TYPE, "application/json")
            .header("origin", ORIGIN)
            .header("referer", REFERER)
            .header(USER_AGENT, self.user_agent.as_str())
            .bearer_auth(&self.api_key)
            .json(&body);

        let timeout = self.timeout;
        let prompt = prompt.to_string();
        let raw = options.raw;
        let conversation = &mut self.conversation;
        let last_response = &mut self.last_response;

        Ok(async_stream::try_stream! {
            tracing::debug!(url = %url, model = %model, "sending chat completion request");
            let response = tokio::time::timeout(timeout, http_request.send())
                .await
                .map_err(|elapsed| {
                    tracing::error!(timeout_ms = timeout.as_millis() as u64, "request timed out");
                    GraniteError::connection(elapsed)
                })?
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if status.is_client_error() || status.is_server_error() {
                let body_text = response.text().await.map_err(map_reqwest_error)?;
                Err::<(), _>(map_http_status(status, body_text))?;
            } else {
                let lines = ndjson_lines(idle_timeout(response.bytes_stream(), timeout));
                let chunks = decode(lines, raw, move |text| {
                    conversation.update_chat_history(&prompt, &text);
                    *last_response = Some(text);
                });
                let mut chunks = std::pin::pin!(chunks);
                while let Some(chunk) = chunks.next().await {
                    yield chunk?;
                }
            }
        })
    }

    /// Stream the reply to `prompt` chunk by chunk.
    ///
    /// Fails immediately if the optimizer is unknown. Transport and status
    /// errors arrive through the stream. The exchange is recorded in the
    /// conversation only if the stream is consumed to the end.
    pub fn ask_stream(
        &mut self,
        prompt: &str,
        options: AskOptions,
    ) -> Result<impl Stream<Item = Result<Chunk, GraniteError>> + Send + '_, GraniteError> {
        self.exchange(prompt, options, true)
    }

    /// Send `prompt` and wait for the whole reply.
    ///
    /// Returns the full text as a `{text}` record regardless of `options.raw`.
    pub async fn ask(&mut self, prompt: &str, options: AskOptions) -> Result<Chunk, GraniteError> {
        {
            let mut chunks = std::pin::pin!(self.exchange(prompt, options, false)?);
            while let Some(chunk) = chunks.next().await {
                chunk?;
            }
        }
        Ok(Chunk::Text {
            text: self.last_response.clone().unwrap_or_default(),
        })
    }

    /// Stream the reply to `prompt` as bare text fragments.
    pub fn chat_stream(
        &mut self,
        prompt: &str,
        options: AskOptions,
    ) -> Result<impl Stream<Item = Result<String, GraniteError>> + Send + '_, GraniteError> {
        let chunks = self.ask_stream(prompt, options.with_raw(false))?;
        Ok(chunks.map(|chunk| chunk.map(Chunk::into_text)))
    }

    /// Send `prompt` and return the whole reply text.
    pub async fn chat(&mut self, prompt: &str, options: AskOptions) -> Result<String, GraniteError> {
        let reply = self.ask(prompt, options.with_raw(false)).await?.into_text();
        tracing::info!("chat completed");
        Ok(reply)
    }
}
