// src/pipeline/crawl.rs

//! Crawl orchestrator.
//!
//! Composes the listing walkers and the comment-tree hydrator under two
//! fan-out limits: subreddit walks run concurrently, and hydration of
//! matched submissions runs concurrently across subreddits, all sharing
//! one rate limiter and one dedup registry. Records stream out as they
//! are produced so partial results survive a mid-run failure.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::RedditSession;
use crate::error::{AppError, Result};
use crate::models::{CommentTree, Config, DateWindow, Submission};
use crate::services::{CommentTreeHydrator, DedupRegistry, ListingWalker, RateLimiter};

/// Matched submissions buffered between the listing and hydration stages.
const MATCH_BUFFER: usize = 64;

/// One output record: a submission with its hydrated comment tree.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlRecord {
    pub submission: Submission,
    pub tree: CommentTree,
}

/// A subreddit that exhausted its retry budget.
#[derive(Debug, Clone, Serialize)]
pub struct SubredditFailure {
    pub subreddit: String,
    pub message: String,
}

/// Aggregate statistics for one crawl run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub subreddits_crawled: usize,
    pub failures: Vec<SubredditFailure>,
    pub submissions_matched: u64,
    pub duplicates_skipped: u64,
    pub records_emitted: u64,
    pub comments_emitted: u64,
    pub trees_incomplete: u64,
    pub hydration_failures: u64,
    pub hydrations_skipped: u64,
    pub cancelled: bool,
}

struct SubredditOutcome {
    name: String,
    matched: u64,
    duplicates: u64,
    error: Option<String>,
}

enum HydrationOutcome {
    Done(CrawlRecord),
    Failed,
    Skipped,
}

#[derive(Default)]
struct HydrationStats {
    emitted: u64,
    comments: u64,
    incomplete: u64,
    failures: u64,
    skipped: u64,
}

/// Crawl `subreddits` over `window`, pushing records into `records` as
/// they are produced.
///
/// A failed subreddit lands in the summary and never aborts the run;
/// cancelling the token stops new requests promptly while in-flight work
/// completes and its records are still flushed.
pub async fn run_crawl<S: RedditSession>(
    session: Arc<S>,
    config: Arc<Config>,
    subreddits: Vec<String>,
    window: DateWindow,
    cancel: CancellationToken,
    records: mpsc::Sender<CrawlRecord>,
) -> Result<RunSummary> {
    if subreddits.is_empty() {
        return Err(AppError::config("no subreddits to crawl"));
    }

    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let dedup = Arc::new(DedupRegistry::new());
    let (matched_tx, matched_rx) = mpsc::channel::<Submission>(MATCH_BUFFER);

    let listing_fanout = config.crawler.listing_fanout;
    let hydration_fanout = config.crawler.hydration_fanout;

    let listing = {
        let session = Arc::clone(&session);
        let config = Arc::clone(&config);
        let limiter = Arc::clone(&limiter);
        let dedup = Arc::clone(&dedup);
        let cancel = cancel.clone();
        async move {
            stream::iter(subreddits)
                .map(|name| {
                    let walker = ListingWalker::new(
                        Arc::clone(&session),
                        Arc::clone(&limiter),
                        Arc::clone(&config),
                    );
                    let dedup = Arc::clone(&dedup);
                    let cancel = cancel.clone();
                    let matched_tx = matched_tx.clone();
                    crawl_subreddit(name, walker, window, dedup, cancel, matched_tx)
                })
                .buffer_unordered(listing_fanout)
                .collect::<Vec<SubredditOutcome>>()
                .await
            // matched_tx drops here, closing the hydration stage's input.
        }
    };

    let hydrator = CommentTreeHydrator::new(
        Arc::clone(&session),
        Arc::clone(&limiter),
        Arc::clone(&config),
        Arc::clone(&dedup),
    );
    let hydration = {
        let cancel = cancel.clone();
        async move {
            let mut stats = HydrationStats::default();
            let submissions = stream::unfold(matched_rx, |mut rx| async move {
                rx.recv().await.map(|submission| (submission, rx))
            });

            let results = submissions
                .map(|submission| {
                    let hydrator = &hydrator;
                    let cancel = cancel.clone();
                    async move {
                        if cancel.is_cancelled() {
                            return HydrationOutcome::Skipped;
                        }
                        match hydrator.hydrate(&submission).await {
                            Ok(tree) => HydrationOutcome::Done(CrawlRecord { submission, tree }),
                            Err(err) => {
                                log::warn!(
                                    "hydration failed for submission {}: {err}",
                                    submission.id
                                );
                                HydrationOutcome::Failed
                            }
                        }
                    }
                })
                .buffer_unordered(hydration_fanout);
            futures::pin_mut!(results);

            while let Some(outcome) = results.next().await {
                match outcome {
                    HydrationOutcome::Done(record) => {
                        stats.comments += record.tree.len() as u64;
                        if !record.tree.complete {
                            stats.incomplete += 1;
                        }
                        if records.send(record).await.is_err() {
                            // Output collaborator hung up; stop producing.
                            break;
                        }
                        stats.emitted += 1;
                    }
                    HydrationOutcome::Failed => stats.failures += 1,
                    HydrationOutcome::Skipped => stats.skipped += 1,
                }
            }
            stats
        }
    };

    let (outcomes, stats) = tokio::join!(listing, hydration);

    let mut summary = RunSummary {
        cancelled: cancel.is_cancelled(),
        ..RunSummary::default()
    };
    for outcome in outcomes {
        summary.submissions_matched += outcome.matched;
        summary.duplicates_skipped += outcome.duplicates;
        match outcome.error {
            Some(message) => {
                log::error!("r/{} failed: {message}", outcome.name);
                summary.failures.push(SubredditFailure {
                    subreddit: outcome.name,
                    message,
                });
            }
            None => summary.subreddits_crawled += 1,
        }
    }
    summary.records_emitted = stats.emitted;
    summary.comments_emitted = stats.comments;
    summary.trees_incomplete = stats.incomplete;
    summary.hydration_failures = stats.failures;
    summary.hydrations_skipped = stats.skipped;

    log::info!(
        "crawl finished: {} record(s) with {} comment(s) from {} subreddit(s), \
         {} duplicate(s) skipped, {} incomplete tree(s), {} failure(s)",
        summary.records_emitted,
        summary.comments_emitted,
        summary.subreddits_crawled,
        summary.duplicates_skipped,
        summary.trees_incomplete,
        summary.failures.len() + summary.hydration_failures as usize,
    );

    Ok(summary)
}

/// Walk one subreddit, pushing fresh in-window submissions downstream.
async fn crawl_subreddit<S: RedditSession>(
    name: String,
    walker: ListingWalker<S>,
    window: DateWindow,
    dedup: Arc<DedupRegistry>,
    cancel: CancellationToken,
    matched_tx: mpsc::Sender<Submission>,
) -> SubredditOutcome {
    let mut outcome = SubredditOutcome {
        name: name.clone(),
        matched: 0,
        duplicates: 0,
        error: None,
    };

    let walk = walker.walk(&name, window);
    futures::pin_mut!(walk);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = walk.try_next() => item,
        };

        match next {
            Ok(Some(submission)) => {
                if !dedup.mark_submission(&submission.id) {
                    outcome.duplicates += 1;
                    continue;
                }
                if matched_tx.send(submission).await.is_err() {
                    break;
                }
                outcome.matched += 1;
            }
            Ok(None) => break,
            Err(err) => {
                outcome.error = Some(err.to_string());
                break;
            }
        }
    }

    outcome
}
