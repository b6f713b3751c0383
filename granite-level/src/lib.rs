#![deny(missing_docs)]
//! Ordered log severity levels.
//!
//! [`Level`] is a closed set of five severities with fixed numeric values.
//! Ordering is by numeric value, names are looked up case-insensitively,
//! and every level maps onto a [`tracing::Level`] so callers can feed it
//! straight into a subscriber filter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// A log severity.
///
/// Comparison is total and follows [`Level::value`]:
/// `Debug < Info < Warning < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
#[repr(u8)]
pub enum Level {
    /// Diagnostic detail.
    Debug = 10,
    /// Routine progress.
    Info = 20,
    /// Something unexpected that the program recovered from.
    Warning = 30,
    /// An operation failed.
    Error = 40,
    /// The program cannot continue.
    Critical = 50,
}

/// Returned when a name does not match any [`Level`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid log level: {name}")]
pub struct InvalidLevelError {
    /// The text that failed to match.
    pub name: String,
}

impl Level {
    /// Every level, least severe first.
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Look up a level by name, ignoring ASCII case.
    ///
    /// Only the five canonical names match. Aliases such as `warn` or
    /// surrounding whitespace are rejected.
    pub fn from_name(name: &str) -> Result<Self, InvalidLevelError> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| InvalidLevelError {
                name: name.to_string(),
            })
    }

    /// Numeric severity.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = InvalidLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl From<Level> for &'static str {
    fn from(level: Level) -> Self {
        level.name()
    }
}

impl TryFrom<String> for Level {
    type Error = InvalidLevelError;

    fn try_from(value: String) -> Result<Self, InvalidLevelError> {
        Self::from_name(&value)
    }
}

/// `Critical` has no tracing counterpart and collapses into `ERROR`.
impl From<Level> for tracing::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warning => tracing::Level::WARN,
            Level::Error | Level::Critical => tracing::Level::ERROR,
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        LevelFilter::from_level(level.into())
    }
}
