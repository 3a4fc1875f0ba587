//! Page/limit pagination arithmetic shared by every list endpoint.
//!
//! Pages are 1-based. `offset = (page - 1) * limit` and
//! `totalPages = ceil(totalItems / limit)`.

use serde::Serialize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// A normalized page request. Construct through [`PageRequest::new`] so the
/// values are always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    /// Normalize raw query values: missing or non-positive `page` becomes 1,
    /// `limit` is clamped to `1..=MAX_LIMIT` with a default of
    /// [`DEFAULT_LIMIT`].
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `ceil(total / limit)`; zero items means zero pages.
pub fn total_pages(total_items: i64, limit: i64) -> i64 {
    if total_items <= 0 || limit <= 0 {
        return 0;
    }
    (total_items + limit - 1) / limit
}

/// Pagination block of the collection envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl PaginationMeta {
    pub fn new(request: PageRequest, total_items: i64) -> Self {
        Self {
            current_page: request.page(),
            total_pages: total_pages(total_items, request.limit()),
            total_items,
            items_per_page: request.limit(),
        }
    }
}

/// Collection envelope: `{ "items": [...], "pagination": {...} }`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: i64) -> Self {
        Self {
            items,
            pagination: PaginationMeta::new(request, total_items),
        }
    }

    /// Map the items while keeping the pagination block.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Number of items a page holds for `n` total rows.
    fn items_on_page(n: i64, request: PageRequest) -> i64 {
        request.limit().min((n - request.offset()).max(0))
    }

    #[test]
    fn defaults_apply_for_missing_or_invalid_values() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page(), req.limit(), req.offset()), (1, 10, 0));

        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!((req.page(), req.limit()), (1, 1));

        let req = PageRequest::new(Some(-3), Some(5_000));
        assert_eq!((req.page(), req.limit()), (1, MAX_LIMIT));
    }

    #[test]
    fn offset_follows_page() {
        let req = PageRequest::new(Some(3), Some(20));
        assert_eq!(req.offset(), 40);
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 7), 14);
    }

    #[test]
    fn page_sizes_cover_all_rows_exactly_once() {
        for n in [0_i64, 1, 9, 10, 11, 37] {
            for limit in [1_i64, 3, 10, 50] {
                let pages = total_pages(n, limit);
                let mut seen = 0;
                for page in 1..=pages + 1 {
                    let req = PageRequest::new(Some(page), Some(limit));
                    let count = items_on_page(n, req);
                    if page > pages {
                        assert_eq!(count, 0, "n={n} limit={limit} page={page}");
                    }
                    seen += count;
                }
                assert_eq!(seen, n, "n={n} limit={limit}");
            }
        }
    }

    #[test]
    fn meta_serializes_camel_case() {
        let meta = PaginationMeta::new(PageRequest::new(Some(2), Some(5)), 12);
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["totalItems"], 12);
        assert_eq!(json["itemsPerPage"], 5);
    }

    /// Row types that keep secrets out of their serialized form are paged
    /// first and mapped to a response type afterwards.
    struct Secret {
        id: i64,
        #[allow(dead_code)]
        hash: String,
    }

    #[derive(Serialize)]
    struct Public {
        id: i64,
    }

    #[test]
    fn unserializable_rows_are_mapped_before_rendering() {
        let rows = vec![
            Secret { id: 1, hash: "x".into() },
            Secret { id: 2, hash: "y".into() },
        ];
        let page = Page::new(rows, PageRequest::new(Some(1), Some(2)), 5)
            .map(|s| Public { id: s.id });
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"][1]["id"], 2);
        assert_eq!(json["pagination"]["totalPages"], 3);
        assert!(json["items"][0].get("hash").is_none());
    }
}
