//! Scripted session double for pipeline tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::client::{CommentNode, MoreStub, RawComment, RedditSession, ResponseMeta, SubmissionPage};
use crate::error::{AppError, Result};
use crate::models::Submission;

/// A `RedditSession` that replays scripted responses and counts calls.
///
/// Exhausted scripts answer with empty pages/trees so walks terminate
/// naturally instead of hanging a test.
#[derive(Default)]
pub struct MockSession {
    pages: Mutex<HashMap<String, VecDeque<Result<SubmissionPage>>>>,
    trees: Mutex<HashMap<String, VecDeque<Result<Vec<CommentNode>>>>>,
    stubs: Mutex<HashMap<String, VecDeque<Result<Vec<CommentNode>>>>>,
    listing_calls: Mutex<HashMap<String, usize>>,
    stub_calls: Mutex<usize>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a listing page for a subreddit.
    pub fn push_page(&self, subreddit: &str, page: SubmissionPage) {
        self.pages
            .lock()
            .entry(subreddit.to_string())
            .or_default()
            .push_back(Ok(page));
    }

    /// Queue a listing error for a subreddit.
    pub fn push_page_err(&self, subreddit: &str, err: AppError) {
        self.pages
            .lock()
            .entry(subreddit.to_string())
            .or_default()
            .push_back(Err(err));
    }

    /// Queue a comment page for a submission.
    pub fn push_tree(&self, submission_id: &str, nodes: Vec<CommentNode>) {
        self.trees
            .lock()
            .entry(submission_id.to_string())
            .or_default()
            .push_back(Ok(nodes));
    }

    /// Queue a comment-page error for a submission.
    pub fn push_tree_err(&self, submission_id: &str, err: AppError) {
        self.trees
            .lock()
            .entry(submission_id.to_string())
            .or_default()
            .push_back(Err(err));
    }

    /// Queue a stub resolution batch.
    pub fn push_stub(&self, stub_id: &str, nodes: Vec<CommentNode>) {
        self.stubs
            .lock()
            .entry(stub_id.to_string())
            .or_default()
            .push_back(Ok(nodes));
    }

    /// Queue a stub resolution error.
    pub fn push_stub_err(&self, stub_id: &str, err: AppError) {
        self.stubs
            .lock()
            .entry(stub_id.to_string())
            .or_default()
            .push_back(Err(err));
    }

    /// Listing pages requested for a subreddit so far.
    pub fn listing_calls(&self, subreddit: &str) -> usize {
        self.listing_calls
            .lock()
            .get(subreddit)
            .copied()
            .unwrap_or(0)
    }

    /// Stub resolutions attempted so far.
    pub fn stub_calls(&self) -> usize {
        *self.stub_calls.lock()
    }
}

#[async_trait]
impl RedditSession for MockSession {
    async fn list_submissions(
        &self,
        subreddit: &str,
        _cursor: Option<&str>,
    ) -> Result<(SubmissionPage, ResponseMeta)> {
        *self
            .listing_calls
            .lock()
            .entry(subreddit.to_string())
            .or_insert(0) += 1;

        let next = self
            .pages
            .lock()
            .get_mut(subreddit)
            .and_then(VecDeque::pop_front);
        match next {
            Some(result) => result.map(|page| (page, ResponseMeta::default())),
            None => Ok((SubmissionPage::default(), ResponseMeta::default())),
        }
    }

    async fn list_comments(
        &self,
        submission_id: &str,
    ) -> Result<(Vec<CommentNode>, ResponseMeta)> {
        let next = self
            .trees
            .lock()
            .get_mut(submission_id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(result) => result.map(|nodes| (nodes, ResponseMeta::default())),
            None => Ok((Vec::new(), ResponseMeta::default())),
        }
    }

    async fn resolve_stub(
        &self,
        _submission_id: &str,
        stub: &MoreStub,
    ) -> Result<(Vec<CommentNode>, ResponseMeta)> {
        *self.stub_calls.lock() += 1;

        let next = self
            .stubs
            .lock()
            .get_mut(&stub.id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(result) => result.map(|nodes| (nodes, ResponseMeta::default())),
            None => Ok((Vec::new(), ResponseMeta::default())),
        }
    }
}

/// Build a submission with the given id and creation time.
pub fn submission(id: &str, created_utc: DateTime<Utc>) -> Submission {
    Submission {
        id: id.to_string(),
        subreddit: "test".into(),
        title: format!("post {id}"),
        author: Some("alice".into()),
        selftext: String::new(),
        created_utc,
        score: 10,
        num_comments: 0,
        permalink: format!("/r/test/comments/{id}/"),
        url: format!("https://reddit.com/r/test/comments/{id}/"),
        link_flair_text: None,
    }
}

/// Build a listing page from submissions and an optional cursor.
pub fn page(items: Vec<Submission>, after: Option<&str>) -> SubmissionPage {
    SubmissionPage {
        items,
        after: after.map(String::from),
    }
}

/// Build a comment node.
pub fn comment(id: &str, parent_id: Option<&str>) -> CommentNode {
    CommentNode::Comment(RawComment {
        id: id.to_string(),
        parent_id: parent_id.map(String::from),
        author: Some("bob".into()),
        body: format!("comment {id}"),
        created_utc: Utc::now(),
        score: 1,
    })
}

/// Build a tombstoned comment node.
pub fn deleted_comment(id: &str, parent_id: Option<&str>) -> CommentNode {
    CommentNode::Comment(RawComment {
        id: id.to_string(),
        parent_id: parent_id.map(String::from),
        author: None,
        body: "[deleted]".into(),
        created_utc: Utc::now(),
        score: 0,
    })
}

/// Build a "more comments" stub node.
pub fn more(id: &str, parent_id: Option<&str>, children: &[&str]) -> CommentNode {
    CommentNode::More(MoreStub {
        id: id.to_string(),
        parent_id: parent_id.map(String::from),
        count: children.len() as u64,
        children: children.iter().map(|c| c.to_string()).collect(),
    })
}
