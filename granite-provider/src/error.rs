//! Error type for the Granite client and the helpers that build it.

use granite_context::ContextError;
use thiserror::Error;

/// Boxed error cause carried by transport and generation failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from the Granite client.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GraniteError {
    /// The endpoint answered with a non-success status before streaming began.
    #[error("request failed with status code {status}: {body}")]
    RequestFailure {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The transport failed while sending the request or reading the body.
    #[error("connection failed: {0}")]
    ConnectionFailure(#[source] BoxError),

    /// Any other fault while turning the response into text.
    #[error("failed to generate response: {0}")]
    GenerationFailure(#[source] BoxError),

    /// The requested model is not served by the endpoint.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// The prompt could not be prepared.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl GraniteError {
    /// Wrap a transport fault.
    pub fn connection(cause: impl Into<BoxError>) -> Self {
        GraniteError::ConnectionFailure(cause.into())
    }

    /// Wrap an unexpected processing fault.
    pub fn generation(cause: impl Into<BoxError>) -> Self {
        GraniteError::GenerationFailure(cause.into())
    }

    /// Whether a caller-side retry might succeed.
    ///
    /// The client never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            GraniteError::ConnectionFailure(_) => true,
            GraniteError::RequestFailure { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Map a [`reqwest::Error`] raised by the transport.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> GraniteError {
    if err.is_timeout() {
        tracing::error!(error = %err, "request timed out");
    } else {
        tracing::error!(error = %err, "request exception");
    }
    GraniteError::connection(err)
}

/// Build the error for a non-success response.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: String) -> GraniteError {
    let err = GraniteError::RequestFailure {
        status: status.as_u16(),
        body,
    };
    tracing::error!(status = status.as_u16(), "{err}");
    err
}
