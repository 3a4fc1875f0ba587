//! Request extractors.
//!
//! - [`auth::AuthUser`] -- staff caller from a Bearer token.
//! - [`auth::AuthClient`] -- external client caller from a Bearer token.
//! - [`auth::ClientIp`] -- caller address for audit rows.
//! - [`rbac`] -- policy checks on [`auth::AuthUser`].

pub mod auth;
pub mod rbac;
