// src/services/mod.rs

//! Core crawl services.
//!
//! Each service is constructed with its shared collaborators (session,
//! rate limiter, dedup registry) injected, so concurrent runs never
//! interfere through globals.

pub mod dedup;
pub mod hydrator;
pub mod rate_limit;
pub mod walker;

pub use dedup::DedupRegistry;
pub use hydrator::CommentTreeHydrator;
pub use rate_limit::{RateLimiter, call_with_quota};
pub use walker::ListingWalker;
