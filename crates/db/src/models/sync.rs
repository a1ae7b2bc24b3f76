//! Change feed cursors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position in a change feed: rows strictly after `(since, after_id)` in
/// `(updated_at, id)` order come next.
///
/// Field order matters: the derived `Ord` is the feed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeCursor {
    pub since: DateTime<Utc>,
    #[serde(default)]
    pub after_id: i32,
}

impl ChangeCursor {
    /// The start of the feed.
    pub const START: Self = Self {
        since: DateTime::<Utc>::UNIX_EPOCH,
        after_id: 0,
    };

    #[must_use]
    pub const fn new(since: DateTime<Utc>, after_id: i32) -> Self {
        Self { since, after_id }
    }
}

impl Default for ChangeCursor {
    fn default() -> Self {
        Self::START
    }
}
