//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async operations. Single
//! statement operations accept any `PgExecutor`, so callers pass either
//! `&PgPool` or `&mut *tx` to take part in a transaction. Operations issuing
//! several statements take `&mut PgConnection` and must be called inside a
//! transaction owned by the caller.

pub mod audit_repo;
pub mod client_repo;
pub mod finance_repo;
pub mod hse_repo;
pub mod leave_repo;
pub mod outbox_repo;
pub mod project_repo;
pub mod proposal_repo;
pub mod role_repo;
pub mod task_repo;
pub mod team_repo;
pub mod user_repo;

pub use audit_repo::AuditRepo;
pub use client_repo::ClientRepo;
pub use finance_repo::FinanceExpenseRepo;
pub use hse_repo::{HseDocumentRepo, HseReportRepo};
pub use leave_repo::LeaveRepo;
pub use outbox_repo::OutboxRepo;
pub use project_repo::ProjectRepo;
pub use proposal_repo::ProposalRepo;
pub use role_repo::RoleRepo;
pub use task_repo::TaskRepo;
pub use team_repo::TeamRepo;
pub use user_repo::UserRepo;
