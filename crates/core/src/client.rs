//! Client approval workflow.
//!
//! External clients register themselves and stay `pending` until an admin
//! approves or rejects them. Only approved clients may log in or see
//! projects. Resubmitting registration documents puts an already decided
//! client back into `pending`.

use crate::define_text_status;
use crate::roles::ROLE_ADMIN;
use crate::workflow::{ActorRule, Transition, TransitionTable};

define_text_status! {
    /// Client account approval status.
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

pub const CLIENT_APPROVAL_TRANSITIONS: TransitionTable<ApprovalStatus> = TransitionTable {
    entity: "Client",
    transitions: &[
        Transition {
            from: &[ApprovalStatus::Pending],
            to: &[ApprovalStatus::Approved, ApprovalStatus::Rejected],
            rule: ActorRule::Roles(&[ROLE_ADMIN]),
        },
        Transition {
            from: &[ApprovalStatus::Approved, ApprovalStatus::Rejected],
            to: &[ApprovalStatus::Pending],
            rule: ActorRule::Owner,
        },
    ],
};

/// Whether a client in this state may authenticate.
pub fn can_log_in(status: ApprovalStatus) -> bool {
    status == ApprovalStatus::Approved
}
