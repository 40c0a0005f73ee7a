//! Utility functions and helpers.

use chrono::{DateTime, TimeZone, Utc};

/// Split a Reddit fullname (`t3_abc123`) into its kind prefix and id.
pub fn split_fullname(fullname: &str) -> Option<(&str, &str)> {
    fullname
        .split_once('_')
        .filter(|(kind, id)| !kind.is_empty() && !id.is_empty())
}

/// Derive a comment's parent reference from a `parent_id` fullname.
///
/// `t1_xyz` points at a parent comment; `t3_xyz` points at the submission
/// itself, meaning the comment is top-level.
pub fn parent_from_fullname(fullname: &str) -> Option<String> {
    match split_fullname(fullname) {
        Some(("t1", id)) => Some(id.to_string()),
        _ => None,
    }
}

/// Convert a `created_utc` epoch value (Reddit sends floats) to a UTC
/// timestamp. Returns `None` for out-of-range values.
pub fn epoch_to_datetime(epoch_secs: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(epoch_secs as i64, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fullname() {
        assert_eq!(split_fullname("t3_abc123"), Some(("t3", "abc123")));
        assert_eq!(split_fullname("t1_q"), Some(("t1", "q")));
        assert_eq!(split_fullname("abc123"), None);
        assert_eq!(split_fullname("t1_"), None);
    }

    #[test]
    fn test_parent_from_fullname() {
        assert_eq!(parent_from_fullname("t1_xyz"), Some("xyz".to_string()));
        assert_eq!(parent_from_fullname("t3_xyz"), None);
        assert_eq!(parent_from_fullname("garbage"), None);
    }

    #[test]
    fn test_epoch_to_datetime() {
        let ts = epoch_to_datetime(1_700_000_000.0).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(epoch_to_datetime(f64::MAX).is_none());
    }
}
