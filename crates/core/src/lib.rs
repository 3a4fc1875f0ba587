//! Crewline domain core.
//!
//! Pure domain logic with no I/O: identifiers, errors, roles and the
//! authorization policy table, status enums with their transition tables,
//! pagination arithmetic, one-time codes, audit helpers, and the email
//! templates used by notification side effects.

pub mod audit;
pub mod client;
pub mod credentials;
pub mod email_templates;
pub mod error;
pub mod hashing;
pub mod hse;
pub mod leave;
pub mod otp;
pub mod pagination;
pub mod policy;
pub mod project;
pub mod proposal;
pub mod roles;
pub mod status;
pub mod types;
pub mod validation;
pub mod workflow;
