//! Page requests and page arithmetic.
//!
//! Every list endpoint accepts `page` (1-based) and `page_size` and answers
//! with a [`Page`]. The page count is `ceil(total / page_size)`; an empty
//! result has zero pages.

use serde::{Deserialize, Serialize};

/// Page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Number of pages needed to show `total` items, `page_size` at a time.
///
/// ```
/// use mistore_core::pagination::total_pages;
///
/// assert_eq!(total_pages(0, 20), 0);
/// assert_eq!(total_pages(20, 20), 1);
/// assert_eq!(total_pages(21, 20), 2);
/// ```
#[must_use]
pub const fn total_pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64)
}

/// Requested page, usually deserialized from the query string.
///
/// Out-of-range values are normalised rather than rejected: page 0 becomes
/// page 1 and the size is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    /// Create a normalised page request.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Build from optional query parameters.
    #[must_use]
    pub fn from_params(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Items per page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip (`OFFSET`).
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.page_size())
    }

    /// Rows to return (`LIMIT`).
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }
}

/// One page of results plus the numbers a table footer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Wrap already-sliced items with the total row count.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total,
            total_pages: total_pages(total, request.page_size()),
        }
    }

    /// An empty first page.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Convert the items, keeping the page metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
        }
    }

    /// Whether a later page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(19, 20), 1);
        assert_eq!(total_pages(41, 20), 3);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_request_normalises_bounds() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), MAX_PAGE_SIZE);

        let req = PageRequest::new(3, 0);
        assert_eq!(req.page_size(), 1);
    }

    #[test]
    fn test_offset_and_limit() {
        let req = PageRequest::new(3, 25);
        assert_eq!(req.offset(), 50);
        assert_eq!(req.limit(), 25);
    }

    #[test]
    fn test_deserialize_defaults() {
        let req: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, PageRequest::default());
    }

    #[test]
    fn test_deserialized_values_are_clamped_on_use() {
        let req: PageRequest = serde_json::from_str(r#"{"page":0,"page_size":500}"#).unwrap();
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_metadata() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(2, 3), 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());

        let last = Page::new(vec![7], PageRequest::new(3, 3), 7);
        assert!(!last.has_next());
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], PageRequest::new(1, 2), 4).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_empty_page() {
        let page: Page<u8> = Page::empty(PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }
}
