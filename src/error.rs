// src/error.rs

//! Unified error handling for the crawler.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Date window with start at or after end
    #[error("Invalid window: start {start} is not before end {end}")]
    Window {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The API asked us to back off (HTTP 429). Handled inside the
    /// rate-limit loop, never surfaced to pipeline callers.
    #[error("Rate limited by the API")]
    RateLimited { reset_in: Option<Duration> },

    /// Network/5xx-class failure, worth retrying
    #[error("Transient fetch error in {context}: {message}")]
    Transient { context: String, message: String },

    /// Response had an unexpected shape
    #[error("Malformed response in {context}: {message}")]
    Malformed { context: String, message: String },

    /// A subreddit exhausted its retry budget; other subreddits continue
    #[error("Subreddit r/{subreddit} failed: {message}")]
    SubredditFailed { subreddit: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transient fetch error with context.
    pub fn transient(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transient {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed-response error with context.
    pub fn malformed(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Malformed {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a per-subreddit fatal error.
    pub fn subreddit_failed(subreddit: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SubredditFailed {
            subreddit: subreddit.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport-level reqwest errors (connect, timeout) count as
    /// transient; rate limiting is handled separately by the limiter.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::transient("listing", "503").is_transient());
        assert!(!AppError::config("bad").is_transient());
        assert!(!AppError::RateLimited { reset_in: None }.is_transient());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::subreddit_failed("rust", "gave up after 3 attempts");
        assert!(err.to_string().contains("r/rust"));
    }
}
