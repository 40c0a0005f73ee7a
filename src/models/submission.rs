//! Submission and comment-tree data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submission (post) as returned by a subreddit listing.
///
/// Records are snapshots at fetch time: hydration never re-reads or
/// refreshes submission fields, so score and comment count reflect the
/// moment the listing page was fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    /// Opaque Reddit id (without the `t3_` prefix)
    pub id: String,

    /// Subreddit the submission belongs to
    pub subreddit: String,

    /// Submission title
    pub title: String,

    /// Author name; `None` for deleted accounts
    pub author: Option<String>,

    /// Self-text body (empty for link posts)
    pub selftext: String,

    /// Creation time (UTC)
    pub created_utc: DateTime<Utc>,

    /// Score at fetch time
    pub score: i64,

    /// Comment count at fetch time
    pub num_comments: u64,

    /// Site-relative permalink
    pub permalink: String,

    /// Target URL (external link or the permalink for self posts)
    pub url: String,

    /// Flair text, if the submission carries one
    pub link_flair_text: Option<String>,
}

/// A single comment inside a submission's tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    /// Comment id, unique within the submission's tree
    pub id: String,

    /// Id of the owning submission
    pub submission_id: String,

    /// Parent comment id; `None` for top-level comments
    pub parent_id: Option<String>,

    /// Author name; `None` for deleted accounts
    pub author: Option<String>,

    /// Comment body; tombstones keep the `[deleted]`/`[removed]` marker
    pub body: String,

    /// Creation time (UTC)
    pub created_utc: DateTime<Utc>,

    /// Score at fetch time
    pub score: i64,

    /// Distance from the submission, recomputed from the parent chain
    pub depth: usize,

    /// Tombstone flag: the comment was deleted or removed but is kept to
    /// preserve tree shape for its descendants
    pub deleted: bool,
}

/// Marker for a "more comments" stub that could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapMarker {
    /// Id of the unresolved stub
    pub stub_id: String,

    /// Parent comment the missing children hang under; `None` if top-level
    pub parent_id: Option<String>,

    /// Child count the API advertised for the stub
    pub count: u64,
}

/// The fully hydrated comment forest of one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentTree {
    /// Id of the owning submission
    pub submission_id: String,

    /// Comments in API order, parents before (or alongside) children
    pub comments: Vec<Comment>,

    /// True only if every stub was resolved without error
    pub complete: bool,

    /// One entry per unresolved stub
    pub gaps: Vec<GapMarker>,
}

impl CommentTree {
    /// An empty, complete tree for a submission with no comments.
    pub fn empty(submission_id: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            comments: Vec::new(),
            complete: true,
            gaps: Vec::new(),
        }
    }

    /// Number of comments in the tree.
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// Whether the tree holds no comments.
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}
