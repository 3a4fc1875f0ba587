//! Shared response envelope types for API handlers.
//!
//! Single resources use a `{ "data": ... }` envelope; collections use
//! [`Page`](crewline_core::pagination::Page) (`{ "items", "pagination" }`).

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
