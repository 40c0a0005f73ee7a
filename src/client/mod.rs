// src/client/mod.rs

//! Session seam between the pipeline and the Reddit API.
//!
//! The pipeline never talks HTTP directly; it goes through the
//! [`RedditSession`] trait so tests can substitute a scripted session.
//! [`http::HttpSession`] is the reference implementation over Reddit's
//! public JSON endpoints.

pub mod http;
pub mod parse;
#[cfg(test)]
pub mod testing;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Submission;

pub use http::HttpSession;

/// Quota signals extracted from a response, fed back into the rate limiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMeta {
    /// Requests remaining in the current quota window, if advertised
    pub rate_remaining: Option<f64>,

    /// Time until the quota window resets, if advertised
    pub rate_reset: Option<Duration>,
}

/// One page of a subreddit's newest-first submission listing.
#[derive(Debug, Clone, Default)]
pub struct SubmissionPage {
    /// Submissions in API order (newest first)
    pub items: Vec<Submission>,

    /// Cursor for the next page; `None` means end of listing
    pub after: Option<String>,
}

/// A node of a comment listing: either a real comment or a "more
/// comments" stub that must be resolved with a follow-up request.
#[derive(Debug, Clone)]
pub enum CommentNode {
    Comment(RawComment),
    More(MoreStub),
}

/// A comment as it appears on the wire, before tree assembly.
///
/// Nodes arrive flattened in API (depth-first) order; the parent link is
/// carried explicitly so tree shape never depends on nesting.
#[derive(Debug, Clone)]
pub struct RawComment {
    pub id: String,
    /// Parent comment id; `None` for top-level comments
    pub parent_id: Option<String>,
    pub author: Option<String>,
    pub body: String,
    pub created_utc: DateTime<Utc>,
    pub score: i64,
}

/// Placeholder for children that must be fetched separately.
#[derive(Debug, Clone)]
pub struct MoreStub {
    pub id: String,
    /// Parent comment the children hang under; `None` if top-level
    pub parent_id: Option<String>,
    /// Child count advertised by the API
    pub count: u64,
    /// Ids of the missing children; empty for "continue this thread"
    /// stubs, which cannot be resolved through the morechildren endpoint
    pub children: Vec<String>,
}

/// Read-only view of the Reddit API used by the crawl pipeline.
///
/// Token acquisition and transport details stay behind this trait.
#[async_trait]
pub trait RedditSession: Send + Sync {
    /// Fetch one page of a subreddit's `/new` listing.
    async fn list_submissions(
        &self,
        subreddit: &str,
        cursor: Option<&str>,
    ) -> Result<(SubmissionPage, ResponseMeta)>;

    /// Fetch the top-level comment page of a submission.
    async fn list_comments(&self, submission_id: &str)
        -> Result<(Vec<CommentNode>, ResponseMeta)>;

    /// Resolve a "more comments" stub into its child nodes.
    async fn resolve_stub(
        &self,
        submission_id: &str,
        stub: &MoreStub,
    ) -> Result<(Vec<CommentNode>, ResponseMeta)>;
}
