//! Shared query parameter types for API handlers.

use crewline_core::pagination::PageRequest;
use serde::Deserialize;

/// Generic pagination parameters (`?page=&limit=`).
///
/// List endpoints with extra filters repeat the two fields in their own
/// query struct (query-string deserialization cannot flatten numeric
/// fields) and call [`PageRequest::new`] directly.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Treat `?field=` (present but empty) the same as an absent parameter.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
