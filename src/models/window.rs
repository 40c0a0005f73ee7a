//! Date window bounding which submissions are in scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Half-open UTC interval: start is inclusive, end is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Position of a submission timestamp relative to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClass {
    /// Strictly older than the window. Listings are reverse-chronological,
    /// so the walker stops paging on the first occurrence.
    Before,
    /// Inside the window; emit.
    Inside,
    /// At or past the window end. Skipped, but paging continues: pinned
    /// and stickied items can appear out of order at the top of a page.
    After,
}

impl DateWindow {
    /// Build a window, rejecting `start >= end` before any network activity.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(AppError::Window { start, end });
        }
        Ok(Self { start, end })
    }

    /// Classify a submission timestamp against this window.
    pub fn classify(&self, ts: DateTime<Utc>) -> WindowClass {
        if ts < self.start {
            WindowClass::Before
        } else if ts < self.end {
            WindowClass::Inside
        } else {
            WindowClass::After
        }
    }
}
