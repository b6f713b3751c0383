#![deny(missing_docs)]
//! Streaming client for the IBM Granite chat completion endpoint.
//!
//! The endpoint answers with newline-delimited JSON where each text-bearing
//! line is a `[3, "<fragment>"]` frame. [`streaming::decode`] turns those
//! lines into [`Chunk`]s; [`Granite`] wraps request construction, headers
//! and conversation bookkeeping around it.

mod client;
mod config;
mod error;
pub mod streaming;
mod types;

pub use client::{AskOptions, Granite};
pub use config::{DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TIMEOUT, GraniteConfig};
pub use error::{BoxError, GraniteError};
pub use streaming::{LineOutcome, SessionState, Skip, SourceError, StreamSession, decode, idle_timeout, ndjson_lines};
pub use types::{Chunk, GraniteMessage, GraniteRequest, Model};
