//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Submission;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// API quota and backoff settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Comment-tree hydration settings
    #[serde(default)]
    pub hydration: HydrationConfig,

    /// Listing filters
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.page_size == 0 || self.crawler.page_size > 100 {
            return Err(AppError::config("crawler.page_size must be in 1..=100"));
        }
        if self.crawler.max_retries == 0 {
            return Err(AppError::config("crawler.max_retries must be > 0"));
        }
        if self.crawler.listing_fanout == 0 {
            return Err(AppError::config("crawler.listing_fanout must be > 0"));
        }
        if self.crawler.hydration_fanout == 0 {
            return Err(AppError::config("crawler.hydration_fanout must be > 0"));
        }
        if self.rate_limit.requests_per_window == 0 {
            return Err(AppError::config("rate_limit.requests_per_window must be > 0"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(AppError::config("rate_limit.window_secs must be > 0"));
        }
        if self.rate_limit.backoff_max_ms < self.rate_limit.backoff_initial_ms {
            return Err(AppError::config(
                "rate_limit.backoff_max_ms must be >= backoff_initial_ms",
            ));
        }
        if !(0.0..1.0).contains(&self.rate_limit.backoff_jitter) {
            return Err(AppError::config("rate_limit.backoff_jitter must be in [0, 1)"));
        }
        if self.rate_limit.backoff_ceiling_secs == 0 {
            return Err(AppError::config("rate_limit.backoff_ceiling_secs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Submissions requested per listing page (API cap is 100)
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Attempts per page/comment fetch before giving up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Concurrent subreddit listing walks
    #[serde(default = "defaults::listing_fanout")]
    pub listing_fanout: usize,

    /// Concurrent comment-tree hydrations
    #[serde(default = "defaults::hydration_fanout")]
    pub hydration_fanout: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            max_retries: defaults::max_retries(),
            listing_fanout: defaults::listing_fanout(),
            hydration_fanout: defaults::hydration_fanout(),
        }
    }
}

/// API quota and backoff settings.
///
/// The request budget refreshes on a fixed window and is corrected from
/// live `x-ratelimit-*` response headers when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    #[serde(default = "defaults::requests_per_window")]
    pub requests_per_window: u32,

    /// Window length in seconds
    #[serde(default = "defaults::window_secs")]
    pub window_secs: u64,

    /// First backoff delay after a 429, in milliseconds
    #[serde(default = "defaults::backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Backoff delay cap, in milliseconds
    #[serde(default = "defaults::backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Jitter fraction added on top of each backoff delay (0.2 = up to +20%)
    #[serde(default = "defaults::backoff_jitter")]
    pub backoff_jitter: f64,

    /// Cumulative backoff ceiling per request, in seconds; past it the
    /// request is abandoned with a retryable error
    #[serde(default = "defaults::backoff_ceiling_secs")]
    pub backoff_ceiling_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_secs(self.backoff_ceiling_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: defaults::requests_per_window(),
            window_secs: defaults::window_secs(),
            backoff_initial_ms: defaults::backoff_initial_ms(),
            backoff_max_ms: defaults::backoff_max_ms(),
            backoff_jitter: defaults::backoff_jitter(),
            backoff_ceiling_secs: defaults::backoff_ceiling_secs(),
        }
    }
}

/// Comment-tree hydration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrationConfig {
    /// Stub-resolution attempts per submission before the tree is
    /// returned incomplete
    #[serde(default = "defaults::stub_attempt_ceiling")]
    pub stub_attempt_ceiling: u32,

    /// Comments requested on the initial comment page
    #[serde(default = "defaults::comment_page_limit")]
    pub comment_page_limit: u32,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            stub_attempt_ceiling: defaults::stub_attempt_ceiling(),
            comment_page_limit: defaults::comment_page_limit(),
        }
    }
}

/// Listing filters applied to in-window submissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum score; submissions below it are skipped
    #[serde(default)]
    pub min_score: Option<i64>,

    /// Accepted flairs (case-insensitive); empty means all
    #[serde(default)]
    pub flairs: Vec<String>,
}

impl FilterConfig {
    /// Whether a submission passes the configured filters.
    pub fn accepts(&self, submission: &Submission) -> bool {
        if let Some(min) = self.min_score {
            if submission.score < min {
                return false;
            }
        }
        if !self.flairs.is_empty() {
            let flair = submission
                .link_flair_text
                .as_deref()
                .unwrap_or("")
                .to_lowercase();
            if !self.flairs.iter().any(|f| f.to_lowercase() == flair) {
                return false;
            }
        }
        true
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "snoocrawl/0.1 (date-bounded subreddit crawler)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn listing_fanout() -> usize {
        4
    }
    pub fn hydration_fanout() -> usize {
        8
    }

    // Rate-limit defaults, sized for Reddit's 60-requests-per-minute tier
    pub fn requests_per_window() -> u32 {
        60
    }
    pub fn window_secs() -> u64 {
        60
    }
    pub fn backoff_initial_ms() -> u64 {
        2_000
    }
    pub fn backoff_max_ms() -> u64 {
        60_000
    }
    pub fn backoff_jitter() -> f64 {
        0.2
    }
    pub fn backoff_ceiling_secs() -> u64 {
        300
    }

    // Hydration defaults
    pub fn stub_attempt_ceiling() -> u32 {
        64
    }
    pub fn comment_page_limit() -> u32 {
        500
    }
}
