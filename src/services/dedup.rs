//! Dedup registry shared by all concurrent crawl paths.
//!
//! Listing pages overlap when items shift position between requests (new
//! submissions, vote churn), so the same submission can show up on two
//! consecutive pages; stub resolutions can likewise re-deliver a comment
//! already seen on the initial page. The registry is in-memory and lives
//! for one run.

use ahash::AHashSet;
use parking_lot::Mutex;

/// Tracks submission and comment identifiers already emitted.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    submissions: Mutex<AHashSet<String>>,
    comments: Mutex<AHashSet<(String, String)>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a submission id has already been marked.
    pub fn seen_submission(&self, id: &str) -> bool {
        self.submissions.lock().contains(id)
    }

    /// Mark a submission id. Returns `false` if it was already marked.
    pub fn mark_submission(&self, id: &str) -> bool {
        self.submissions.lock().insert(id.to_string())
    }

    /// Whether a (submission, comment) pair has already been marked.
    pub fn seen_comment(&self, submission_id: &str, comment_id: &str) -> bool {
        self.comments
            .lock()
            .contains(&(submission_id.to_string(), comment_id.to_string()))
    }

    /// Mark a (submission, comment) pair. Returns `false` if already marked.
    pub fn mark_comment(&self, submission_id: &str, comment_id: &str) -> bool {
        self.comments
            .lock()
            .insert((submission_id.to_string(), comment_id.to_string()))
    }

    /// Submissions marked so far.
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_marking() {
        let registry = DedupRegistry::new();
        assert!(!registry.seen_submission("abc"));
        assert!(registry.mark_submission("abc"));
        assert!(registry.seen_submission("abc"));
        assert!(!registry.mark_submission("abc"));
        assert_eq!(registry.submission_count(), 1);
    }

    #[test]
    fn test_comment_pairs_are_scoped_to_submission() {
        let registry = DedupRegistry::new();
        assert!(registry.mark_comment("s1", "c1"));
        assert!(!registry.mark_comment("s1", "c1"));
        // The same comment id under a different submission is distinct.
        assert!(registry.mark_comment("s2", "c1"));
        assert!(registry.seen_comment("s1", "c1"));
        assert!(!registry.seen_comment("s1", "c2"));
    }
}
