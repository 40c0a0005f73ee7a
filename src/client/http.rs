//! Reference `RedditSession` over Reddit's public JSON endpoints.
//!
//! Read-only, unauthenticated access: listing pages, comment pages, and
//! the morechildren endpoint. OAuth token handling is out of scope; a
//! deployment that needs the authenticated tier swaps the base URL and
//! injects its own transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use url::Url;

use crate::client::{CommentNode, MoreStub, RedditSession, ResponseMeta, SubmissionPage, parse};
use crate::error::{AppError, Result};
use crate::models::Config;

const DEFAULT_BASE: &str = "https://www.reddit.com/";

/// HTTP-backed session for the crawl pipeline.
pub struct HttpSession {
    client: reqwest::Client,
    base: Url,
    config: Arc<Config>,
}

impl HttpSession {
    /// Create a session with a client configured from `[crawler]` settings.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.crawler.user_agent)
            .timeout(Duration::from_secs(config.crawler.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base: Url::parse(DEFAULT_BASE)?,
            config,
        })
    }

    /// Fetch a URL and decode the body, mapping status codes onto the
    /// pipeline's error kinds: 429 backs off, 5xx and transport failures
    /// retry, everything else is surfaced as-is for the caller's budget.
    async fn get_json(&self, url: Url, context: &str) -> Result<(Value, ResponseMeta)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::transient(context, e))?;

        let meta = meta_from_headers(response.headers());
        let status = response.status();

        if status.as_u16() == 429 {
            let reset_in = retry_after(response.headers()).or(meta.rate_reset);
            return Err(AppError::RateLimited { reset_in });
        }
        if !status.is_success() {
            return Err(AppError::transient(context, format!("status {status}")));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| AppError::transient(context, e))?;
        Ok((value, meta))
    }

    fn listing_url(&self, subreddit: &str, cursor: Option<&str>) -> Result<Url> {
        let mut url = self.base.join(&format!("r/{subreddit}/new.json"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.config.crawler.page_size.to_string());
            query.append_pair("raw_json", "1");
            if let Some(after) = cursor {
                query.append_pair("after", after);
            }
        }
        Ok(url)
    }

    fn comments_url(&self, submission_id: &str) -> Result<Url> {
        let mut url = self.base.join(&format!("comments/{submission_id}.json"))?;
        url.query_pairs_mut()
            .append_pair("limit", &self.config.hydration.comment_page_limit.to_string())
            .append_pair("raw_json", "1");
        Ok(url)
    }

    fn morechildren_url(&self, submission_id: &str, stub: &MoreStub) -> Result<Url> {
        let mut url = self.base.join("api/morechildren.json")?;
        url.query_pairs_mut()
            .append_pair("api_type", "json")
            .append_pair("link_id", &format!("t3_{submission_id}"))
            .append_pair("children", &stub.children.join(","))
            .append_pair("raw_json", "1");
        Ok(url)
    }
}

#[async_trait]
impl RedditSession for HttpSession {
    async fn list_submissions(
        &self,
        subreddit: &str,
        cursor: Option<&str>,
    ) -> Result<(SubmissionPage, ResponseMeta)> {
        let url = self.listing_url(subreddit, cursor)?;
        let (value, meta) = self.get_json(url, "listing page").await?;
        let page = parse::parse_listing_page(subreddit, &value)?;
        Ok((page, meta))
    }

    async fn list_comments(
        &self,
        submission_id: &str,
    ) -> Result<(Vec<CommentNode>, ResponseMeta)> {
        let url = self.comments_url(submission_id)?;
        let (value, meta) = self.get_json(url, "comment page").await?;
        let nodes = parse::parse_comment_page(&value)?;
        Ok((nodes, meta))
    }

    async fn resolve_stub(
        &self,
        submission_id: &str,
        stub: &MoreStub,
    ) -> Result<(Vec<CommentNode>, ResponseMeta)> {
        let url = self.morechildren_url(submission_id, stub)?;
        let (value, meta) = self.get_json(url, "more comments").await?;
        let nodes = parse::parse_more_children(&value)?;
        Ok((nodes, meta))
    }
}

/// Extract quota signals from `x-ratelimit-*` response headers.
fn meta_from_headers(headers: &HeaderMap) -> ResponseMeta {
    let rate_remaining = header_f64(headers, "x-ratelimit-remaining");
    let rate_reset = header_f64(headers, "x-ratelimit-reset")
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64);

    ResponseMeta {
        rate_remaining,
        rate_reset,
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_f64(headers, "retry-after")
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_meta_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("42.0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("37"));

        let meta = meta_from_headers(&headers);
        assert_eq!(meta.rate_remaining, Some(42.0));
        assert_eq!(meta.rate_reset, Some(Duration::from_secs(37)));
    }

    #[test]
    fn test_meta_tolerates_missing_headers() {
        let meta = meta_from_headers(&HeaderMap::new());
        assert_eq!(meta.rate_remaining, None);
        assert_eq!(meta.rate_reset, None);
    }

    #[test]
    fn test_listing_url_carries_cursor() {
        let session = HttpSession::new(Arc::new(Config::default())).unwrap();
        let url = session.listing_url("rust", Some("t3_abc")).unwrap();
        assert!(url.as_str().starts_with("https://www.reddit.com/r/rust/new.json"));
        assert!(url.query().unwrap().contains("after=t3_abc"));

        let first = session.listing_url("rust", None).unwrap();
        assert!(!first.query().unwrap().contains("after"));
    }

    #[test]
    fn test_morechildren_url_lists_children() {
        let session = HttpSession::new(Arc::new(Config::default())).unwrap();
        let stub = MoreStub {
            id: "m1".into(),
            parent_id: Some("c1".into()),
            count: 2,
            children: vec!["c3".into(), "c4".into()],
        };
        let url = session.morechildren_url("abc", &stub).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("link_id=t3_abc"));
        assert!(query.contains("children=c3%2Cc4"));
    }
}
