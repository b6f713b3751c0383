//! Errors from prompt preparation.

use thiserror::Error;

/// Errors raised while turning a user prompt into a request prompt.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// No optimizer is registered under the requested name.
    #[error("optimizer `{name}` is not one of {available:?}")]
    UnknownOptimizer {
        /// The requested name.
        name: String,
        /// Names that are registered.
        available: Vec<String>,
    },
}
