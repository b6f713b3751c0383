#![deny(missing_docs)]
//! Prompt-side toolkit for the Granite client.
//!
//! Provides the in-memory [`Conversation`] transcript that is replayed into
//! each prompt, and the [`OptimizerSet`] of named prompt rewrites.

pub mod conversation;
pub mod error;
pub mod optimizer;

pub use conversation::Conversation;
pub use error::ContextError;
pub use optimizer::{CodeOptimizer, Optimizer, OptimizerSet, ShellCommandOptimizer};
