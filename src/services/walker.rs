//! Listing walker: pages through a subreddit's newest-first listing,
//! stopping as soon as the date window is exhausted.
//!
//! Reddit listings are reverse-chronological, so the first submission
//! strictly older than the window start proves that no later page can
//! contain an in-window item. That early stop is what keeps a bounded
//! window from paging through the entire subreddit history.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};

use crate::client::RedditSession;
use crate::error::{AppError, Result};
use crate::models::{Config, DateWindow, Submission, WindowClass};
use crate::services::rate_limit::{RateLimiter, call_with_quota};

/// Paging position inside one subreddit's listing.
#[derive(Debug, Default, Clone)]
pub struct CrawlCursor {
    /// Opaque token for the next page; `None` before the first request
    pub after: Option<String>,

    /// Timestamp of the last submission seen, for drift diagnostics
    pub last_seen: Option<DateTime<Utc>>,
}

struct WalkState {
    cursor: CrawlCursor,
    queue: VecDeque<Submission>,
    exhausted: bool,
}

/// Walks one subreddit listing at a time; shares its limiter with every
/// other concurrent walk of the run.
pub struct ListingWalker<S> {
    session: Arc<S>,
    limiter: Arc<RateLimiter>,
    config: Arc<Config>,
}

impl<S: RedditSession> ListingWalker<S> {
    pub fn new(session: Arc<S>, limiter: Arc<RateLimiter>, config: Arc<Config>) -> Self {
        Self {
            session,
            limiter,
            config,
        }
    }

    /// Lazily yield in-window submissions, newest first.
    ///
    /// The stream is forward-only and non-restartable; dropping it stops
    /// paging. Transient page failures retry the same cursor up to the
    /// configured attempt budget before the walk fails for this
    /// subreddit.
    pub fn walk<'a>(
        &'a self,
        subreddit: &'a str,
        window: DateWindow,
    ) -> impl Stream<Item = Result<Submission>> + 'a {
        let state = WalkState {
            cursor: CrawlCursor::default(),
            queue: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(state, move |mut state| async move {
            loop {
                if let Some(next) = state.queue.pop_front() {
                    return Ok(Some((next, state)));
                }
                if state.exhausted {
                    return Ok(None);
                }

                let page = self
                    .fetch_page(subreddit, state.cursor.after.as_deref())
                    .await?;

                // An empty page or a missing cursor is the end of the
                // listing; the walk ends normally.
                if page.items.is_empty() || page.after.is_none() {
                    state.exhausted = true;
                }
                state.cursor.after = page.after;

                for item in page.items {
                    state.cursor.last_seen = Some(item.created_utc);
                    match window.classify(item.created_utc) {
                        WindowClass::Before => {
                            // Older items only get older: stop paging.
                            state.exhausted = true;
                            break;
                        }
                        WindowClass::After => {}
                        WindowClass::Inside => {
                            if self.config.filter.accepts(&item) {
                                state.queue.push_back(item);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Fetch one listing page, retrying the same cursor on transient
    /// failures up to `crawler.max_retries` attempts.
    async fn fetch_page(
        &self,
        subreddit: &str,
        cursor: Option<&str>,
    ) -> Result<crate::client::SubmissionPage> {
        let mut attempt = 0;
        loop {
            let result = call_with_quota(&self.limiter, "listing page", || {
                self.session.list_submissions(subreddit, cursor)
            })
            .await;

            match result {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    if attempt >= self.config.crawler.max_retries {
                        return Err(AppError::subreddit_failed(
                            subreddit,
                            format!("listing fetch gave up after {attempt} attempts: {err}"),
                        ));
                    }
                    log::warn!(
                        "retrying listing page for r/{subreddit} (attempt {attempt}): {err}"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::TryStreamExt;

    use crate::client::testing::{MockSession, page, submission};

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day)
    }

    fn window() -> DateWindow {
        DateWindow::new(ts(0), ts(2)).unwrap()
    }

    fn walker(session: Arc<MockSession>, config: Config) -> ListingWalker<MockSession> {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        ListingWalker::new(session, limiter, Arc::new(config))
    }

    #[tokio::test]
    async fn test_stops_paging_after_first_before() {
        let session = Arc::new(MockSession::new());
        session.push_page(
            "test",
            page(vec![submission("in", ts(1)), submission("old", ts(-1))], Some("cur")),
        );
        // A second page exists but must never be requested.
        session.push_page("test", page(vec![submission("older", ts(-2))], None));

        let walker = walker(Arc::clone(&session), Config::default());
        let items: Vec<Submission> = walker.walk("test", window()).try_collect().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "in");
        assert_eq!(session.listing_calls("test"), 1);
    }

    #[tokio::test]
    async fn test_after_items_skip_but_paging_continues() {
        let session = Arc::new(MockSession::new());
        // A stickied post dated past the window sits on top of the page.
        session.push_page(
            "test",
            page(vec![submission("pinned", ts(5)), submission("a", ts(1))], Some("cur")),
        );
        session.push_page("test", page(vec![submission("b", ts(0))], None));

        let walker = walker(Arc::clone(&session), Config::default());
        let items: Vec<Submission> = walker.walk("test", window()).try_collect().await.unwrap();

        let ids: Vec<&str> = items.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(session.listing_calls("test"), 2);
    }

    #[tokio::test]
    async fn test_empty_listing_ends_normally() {
        let session = Arc::new(MockSession::new());

        let walker = walker(Arc::clone(&session), Config::default());
        let items: Vec<Submission> = walker.walk("test", window()).try_collect().await.unwrap();

        assert!(items.is_empty());
        assert_eq!(session.listing_calls("test"), 1);
    }

    #[tokio::test]
    async fn test_transient_error_retries_then_succeeds() {
        let session = Arc::new(MockSession::new());
        session.push_page_err("test", AppError::transient("listing page", "503"));
        session.push_page("test", page(vec![submission("a", ts(1))], None));

        let walker = walker(Arc::clone(&session), Config::default());
        let items: Vec<Submission> = walker.walk("test", window()).try_collect().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(session.listing_calls("test"), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_fails_subreddit() {
        let session = Arc::new(MockSession::new());
        for _ in 0..3 {
            session.push_page_err("test", AppError::transient("listing page", "503"));
        }

        let walker = walker(Arc::clone(&session), Config::default());
        let result: Result<Vec<Submission>> = walker.walk("test", window()).try_collect().await;

        assert!(matches!(
            result.unwrap_err(),
            AppError::SubredditFailed { .. }
        ));
        assert_eq!(session.listing_calls("test"), 3);
    }

    #[tokio::test]
    async fn test_listing_filters_apply() {
        let session = Arc::new(MockSession::new());
        let mut low = submission("low", ts(1));
        low.score = 1;
        session.push_page("test", page(vec![submission("hi", ts(1)), low], None));

        let mut config = Config::default();
        config.filter.min_score = Some(5);
        let walker = walker(Arc::clone(&session), config);
        let items: Vec<Submission> = walker.walk("test", window()).try_collect().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "hi");
    }
}
