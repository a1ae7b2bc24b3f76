//! In-memory list plumbing for small admin tables.
//!
//! Coupons and lottery activities number in the dozens, so their admin
//! tables load every row and filter, sort and slice here rather than building
//! dynamic SQL.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pagination::{Page, PageRequest};

/// Sort direction from a `dir=asc|desc` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parse an optional query value, defaulting to descending.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// Apply the direction to an ascending comparison.
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

/// Case-insensitive substring match used by table search boxes.
///
/// An empty or missing needle matches everything.
#[must_use]
pub fn matches_search(needle: Option<&str>, haystacks: &[&str]) -> bool {
    let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

/// Stable sort by key in the given direction.
pub fn sort_by_key<T, K: Ord>(items: &mut [T], direction: SortDirection, key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| direction.apply(key(a).cmp(&key(b))));
}

/// Slice an already filtered and sorted list into the requested page.
///
/// Requests past the last page return an empty page with correct totals.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    let slice = items.into_iter().skip(offset).take(limit).collect();
    Page::new(slice, request, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_param() {
        assert_eq!(SortDirection::from_param(Some("ASC")), SortDirection::Asc);
        assert_eq!(SortDirection::from_param(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::from_param(Some("bogus")), SortDirection::Desc);
        assert_eq!(SortDirection::from_param(None), SortDirection::Desc);
    }

    #[test]
    fn test_matches_search() {
        assert!(matches_search(None, &["anything"]));
        assert!(matches_search(Some("  "), &["anything"]));
        assert!(matches_search(Some("redmi"), &["Xiaomi Redmi Note 13", "phones"]));
        assert!(matches_search(Some("WELCOME"), &["welcome10"]));
        assert!(!matches_search(Some("poco"), &["Redmi", "Mi Band"]));
    }

    #[test]
    fn test_sort_by_key_both_directions() {
        let mut items = vec![3, 1, 2];
        sort_by_key(&mut items, SortDirection::Asc, |n| *n);
        assert_eq!(items, vec![1, 2, 3]);
        sort_by_key(&mut items, SortDirection::Desc, |n| *n);
        assert_eq!(items, vec![3, 2, 1]);
    }

    #[test]
    fn test_paginate_slices_and_counts() {
        let items: Vec<u32> = (1..=45).collect();
        let page = paginate(items, PageRequest::new(3, 20));
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_paginate_past_end() {
        let page = paginate(vec![1, 2, 3], PageRequest::new(5, 2));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_page_count_matches_filtered_length() {
        let filtered: Vec<u32> = (1..=100).filter(|n| n % 3 == 0).collect();
        let len = filtered.len() as u64;
        let page = paginate(filtered, PageRequest::new(1, 7));
        assert_eq!(page.total_pages, len.div_ceil(7));
    }
}
