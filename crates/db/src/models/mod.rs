//! Row models and input DTOs, one module per table family.
//!
//! Row structs contain every column and are never serialized when they hold
//! secrets; `*Response` types are the outward-facing shapes.

pub mod audit;
pub mod client;
pub mod finance;
pub mod hse;
pub mod leave;
pub mod outbox;
pub mod project;
pub mod proposal;
pub mod role;
pub mod task;
pub mod team;
pub mod user;
