pub mod audits;
pub mod auth;
pub mod clients;
pub mod finance;
pub mod hse;
pub mod leave;
pub mod projects;
pub mod proposals;
pub mod tasks;
pub mod teams;
pub mod users;

use crewline_core::error::CoreError;
use crewline_core::types::DbId;

use crate::error::AppError;

/// `404` for `entity` with `id`.
pub(crate) fn not_found(entity: &'static str, id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity, id })
}
