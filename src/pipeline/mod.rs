//! Pipeline entry point for crawl runs.

pub mod crawl;

pub use crawl::{CrawlRecord, RunSummary, SubredditFailure, run_crawl};
