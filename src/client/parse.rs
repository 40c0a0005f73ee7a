//! Tolerant parsing of Reddit's JSON wire format.
//!
//! A malformed item never fails its page: it is skipped and logged, and
//! the surrounding listing keeps going. Only a page whose envelope is
//! unusable surfaces an error.

use serde_json::Value;

use crate::client::{CommentNode, MoreStub, RawComment, SubmissionPage};
use crate::error::{AppError, Result};
use crate::models::Submission;
use crate::utils::{epoch_to_datetime, parent_from_fullname};

/// Parse one `/r/{sub}/new.json` listing page.
pub fn parse_listing_page(subreddit: &str, value: &Value) -> Result<SubmissionPage> {
    let data = value
        .get("data")
        .ok_or_else(|| AppError::malformed("listing", "missing data envelope"))?;
    let children = data
        .get("children")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed("listing", "missing children array"))?;

    let mut items = Vec::with_capacity(children.len());
    for child in children {
        let kind = child.get("kind").and_then(Value::as_str).unwrap_or("");
        if kind != "t3" {
            log::warn!("skipping non-submission listing item of kind {kind:?}");
            continue;
        }
        match child.get("data").and_then(|d| parse_submission(subreddit, d)) {
            Some(submission) => items.push(submission),
            None => log::warn!("skipping malformed submission in r/{subreddit} listing"),
        }
    }

    let after = data
        .get("after")
        .and_then(Value::as_str)
        .map(String::from);

    Ok(SubmissionPage { items, after })
}

/// Parse a `/comments/{id}.json` response into flattened comment nodes.
///
/// The response is a two-element array: the submission listing, then the
/// comment listing. Only the latter is consumed here.
pub fn parse_comment_page(value: &Value) -> Result<Vec<CommentNode>> {
    let listing = value
        .get(1)
        .ok_or_else(|| AppError::malformed("comments", "expected two-listing response"))?;
    let children = listing
        .pointer("/data/children")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed("comments", "missing children array"))?;
    Ok(flatten_nodes(children))
}

/// Parse an `/api/morechildren` response into flattened comment nodes.
pub fn parse_more_children(value: &Value) -> Result<Vec<CommentNode>> {
    let things = value
        .pointer("/json/data/things")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed("morechildren", "missing things array"))?;
    Ok(flatten_nodes(things))
}

/// Flatten a children array into nodes in depth-first API order.
///
/// Uses an explicit stack: thread depth is unbounded on the wire and must
/// not be bounded by the call stack here.
fn flatten_nodes(children: &[Value]) -> Vec<CommentNode> {
    let mut out = Vec::with_capacity(children.len());
    let mut stack: Vec<&Value> = children.iter().rev().collect();

    while let Some(thing) = stack.pop() {
        let kind = thing.get("kind").and_then(Value::as_str).unwrap_or("");
        let Some(data) = thing.get("data") else {
            log::warn!("skipping comment node without data");
            continue;
        };

        match kind {
            "t1" => {
                match parse_comment(data) {
                    Some(comment) => out.push(CommentNode::Comment(comment)),
                    None => log::warn!("skipping malformed comment node"),
                }
                // Replies come right after their parent, before the next
                // sibling. `replies` is an empty string when absent.
                if let Some(replies) = data
                    .pointer("/replies/data/children")
                    .and_then(Value::as_array)
                {
                    for reply in replies.iter().rev() {
                        stack.push(reply);
                    }
                }
            }
            "more" => match parse_more(data) {
                Some(stub) => out.push(CommentNode::More(stub)),
                None => log::warn!("skipping malformed more-comments stub"),
            },
            other => log::warn!("skipping comment node of unexpected kind {other:?}"),
        }
    }

    out
}

fn parse_submission(subreddit: &str, data: &Value) -> Option<Submission> {
    let id = data.get("id")?.as_str()?.to_string();
    let created_utc = epoch_to_datetime(data.get("created_utc")?.as_f64()?)?;

    Some(Submission {
        id,
        subreddit: data
            .get("subreddit")
            .and_then(Value::as_str)
            .unwrap_or(subreddit)
            .to_string(),
        title: string_field(data, "title"),
        author: author_field(data),
        selftext: string_field(data, "selftext"),
        created_utc,
        score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
        num_comments: data.get("num_comments").and_then(Value::as_u64).unwrap_or(0),
        permalink: string_field(data, "permalink"),
        url: string_field(data, "url"),
        link_flair_text: data
            .get("link_flair_text")
            .and_then(Value::as_str)
            .map(String::from),
    })
}

fn parse_comment(data: &Value) -> Option<RawComment> {
    let id = data.get("id")?.as_str()?.to_string();
    let created_utc = epoch_to_datetime(data.get("created_utc")?.as_f64()?)?;

    Some(RawComment {
        id,
        parent_id: parent_field(data),
        author: author_field(data),
        body: string_field(data, "body"),
        created_utc,
        score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
    })
}

fn parse_more(data: &Value) -> Option<MoreStub> {
    let id = data.get("id")?.as_str()?.to_string();
    let children = data
        .get("children")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(MoreStub {
        id,
        parent_id: parent_field(data),
        count: data.get("count").and_then(Value::as_u64).unwrap_or(0),
        children,
    })
}

fn parent_field(data: &Value) -> Option<String> {
    data.get("parent_id")
        .and_then(Value::as_str)
        .and_then(parent_from_fullname)
}

fn author_field(data: &Value) -> Option<String> {
    data.get("author")
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty() && *a != "[deleted]")
        .map(String::from)
}

fn string_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
