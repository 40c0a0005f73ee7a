//! Comment-tree hydrator: expands a submission's comment forest until no
//! "more comments" stubs remain or the per-submission attempt ceiling is
//! reached.
//!
//! Resolution runs over an explicit worklist of unresolved stubs rather
//! than recursive calls, so thread depth never touches the call stack.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;

use crate::client::{CommentNode, MoreStub, RawComment, RedditSession};
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentTree, Config, GapMarker, Submission};
use crate::services::dedup::DedupRegistry;
use crate::services::rate_limit::{RateLimiter, call_with_quota};

/// Hydrates one submission at a time; safe to drive concurrently for
/// different submissions since all shared state sits in the injected
/// limiter and registry.
pub struct CommentTreeHydrator<S> {
    session: Arc<S>,
    limiter: Arc<RateLimiter>,
    config: Arc<Config>,
    dedup: Arc<DedupRegistry>,
}

impl<S: RedditSession> CommentTreeHydrator<S> {
    pub fn new(
        session: Arc<S>,
        limiter: Arc<RateLimiter>,
        config: Arc<Config>,
        dedup: Arc<DedupRegistry>,
    ) -> Self {
        Self {
            session,
            limiter,
            config,
            dedup,
        }
    }

    /// Fetch and fully expand a submission's comment forest.
    ///
    /// Stub-resolution failures never fail the call: once the attempt
    /// ceiling is spent, the tree comes back with `complete = false` and
    /// one gap marker per unresolved stub.
    pub async fn hydrate(&self, submission: &Submission) -> Result<CommentTree> {
        let nodes = self.fetch_top_level(&submission.id).await?;

        let mut comments: Vec<Comment> = Vec::new();
        let mut pending: VecDeque<MoreStub> = VecDeque::new();
        let mut gaps: Vec<GapMarker> = Vec::new();
        self.absorb(nodes, &submission.id, &mut comments, &mut pending, &mut gaps);

        let ceiling = self.config.hydration.stub_attempt_ceiling;
        let mut attempts = 0u32;

        while let Some(stub) = pending.pop_front() {
            if attempts >= ceiling {
                pending.push_front(stub);
                log::warn!(
                    "stub resolution ceiling ({ceiling}) reached for submission {}, \
                     leaving {} stub(s) unresolved",
                    submission.id,
                    pending.len()
                );
                break;
            }
            attempts += 1;

            let result = call_with_quota(&self.limiter, "more comments", || {
                self.session.resolve_stub(&submission.id, &stub)
            })
            .await;

            match result {
                Ok(nodes) => {
                    self.absorb(nodes, &submission.id, &mut comments, &mut pending, &mut gaps);
                }
                Err(err) if err.is_transient() => {
                    // Re-queue; the attempt ceiling bounds how often a
                    // stubborn stub comes back around.
                    log::warn!(
                        "stub {} of submission {} failed ({err}), re-queueing",
                        stub.id,
                        submission.id
                    );
                    pending.push_back(stub);
                }
                Err(err) => return Err(err),
            }
        }

        for stub in pending {
            gaps.push(gap_from_stub(stub));
        }

        assign_depths(&mut comments);

        Ok(CommentTree {
            submission_id: submission.id.clone(),
            complete: gaps.is_empty(),
            comments,
            gaps,
        })
    }

    /// Fetch the top-level comment page, retrying transient failures up
    /// to the configured attempt budget.
    async fn fetch_top_level(&self, submission_id: &str) -> Result<Vec<CommentNode>> {
        let mut attempt = 0;
        loop {
            let result = call_with_quota(&self.limiter, "comment page", || {
                self.session.list_comments(submission_id)
            })
            .await;

            match result {
                Ok(nodes) => return Ok(nodes),
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    if attempt >= self.config.crawler.max_retries {
                        return Err(AppError::transient(
                            "comment page",
                            format!(
                                "submission {submission_id} gave up after {attempt} attempts: {err}"
                            ),
                        ));
                    }
                    log::warn!(
                        "retrying comment page for submission {submission_id} \
                         (attempt {attempt}): {err}"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Sort incoming nodes into comments and pending stubs. Duplicate
    /// comment ids (overlapping stub batches) are dropped through the
    /// shared registry; unresolvable "continue this thread" stubs go
    /// straight to the gap list.
    fn absorb(
        &self,
        nodes: Vec<CommentNode>,
        submission_id: &str,
        comments: &mut Vec<Comment>,
        pending: &mut VecDeque<MoreStub>,
        gaps: &mut Vec<GapMarker>,
    ) {
        for node in nodes {
            match node {
                CommentNode::Comment(raw) => {
                    if !self.dedup.mark_comment(submission_id, &raw.id) {
                        continue;
                    }
                    comments.push(comment_from_raw(raw, submission_id));
                }
                CommentNode::More(stub) => {
                    if stub.children.is_empty() {
                        gaps.push(gap_from_stub(stub));
                    } else {
                        pending.push_back(stub);
                    }
                }
            }
        }
    }
}

fn comment_from_raw(raw: RawComment, submission_id: &str) -> Comment {
    let deleted = raw.author.is_none() && matches!(raw.body.as_str(), "[deleted]" | "[removed]");
    Comment {
        id: raw.id,
        submission_id: submission_id.to_string(),
        parent_id: raw.parent_id,
        author: raw.author,
        body: raw.body,
        created_utc: raw.created_utc,
        score: raw.score,
        depth: 0,
        deleted,
    }
}

fn gap_from_stub(stub: MoreStub) -> GapMarker {
    GapMarker {
        stub_id: stub.id,
        parent_id: stub.parent_id,
        count: stub.count,
    }
}

/// Recompute each comment's depth by walking its parent chain instead of
/// trusting wire-level depth fields. Chains end at top level, at a parent
/// missing from the tree (unresolved stub), or at the comment-count bound
/// in case a malformed response smuggled in a cycle.
fn assign_depths(comments: &mut [Comment]) {
    let parent_of: AHashMap<&str, Option<&str>> = comments
        .iter()
        .map(|c| (c.id.as_str(), c.parent_id.as_deref()))
        .collect();

    let bound = comments.len();
    let mut depths: Vec<usize> = Vec::with_capacity(bound);
    for comment in comments.iter() {
        let mut depth = 0;
        let mut cursor = comment.parent_id.as_deref();
        while let Some(parent) = cursor {
            depth += 1;
            if depth > bound {
                break;
            }
            cursor = parent_of.get(parent).copied().flatten();
        }
        depths.push(depth);
    }
    for (comment, depth) in comments.iter_mut().zip(depths) {
        comment.depth = depth;
    }
}
