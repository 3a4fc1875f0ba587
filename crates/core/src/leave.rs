//! Leave request status workflow.
//!
//! A leave request is created `pending` and decided exactly once by a
//! supervisor. Field edits and deletion are only legal while it is still
//! `pending`.

use crate::define_text_status;
use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, SUPERVISORS};
use crate::types::Date;
use crate::workflow::{ActorRule, Transition, TransitionTable};

define_text_status! {
    /// Leave request decision status.
    LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// Known leave categories.
pub const LEAVE_TYPES: &[&str] = &["annual", "sick", "unpaid", "parental", "other"];

pub const LEAVE_TRANSITIONS: TransitionTable<LeaveStatus> = TransitionTable {
    entity: "Leave",
    transitions: &[Transition {
        from: &[LeaveStatus::Pending],
        to: &[LeaveStatus::Approved, LeaveStatus::Rejected],
        rule: ActorRule::Roles(SUPERVISORS),
    }],
};

/// States in which the request body may still be edited.
pub const EDITABLE_STATES: &[LeaveStatus] = &[LeaveStatus::Pending];

/// Rule for editing a pending request.
pub const EDIT_RULE: ActorRule = ActorRule::OwnerOr(SUPERVISORS);

/// Rule for withdrawing (deleting) a pending request.
pub const DELETE_RULE: ActorRule = ActorRule::OwnerOr(&[ROLE_ADMIN]);

/// Validate the leave type and that the date range is not inverted.
pub fn validate_request(leave_type: &str, start: Date, end: Date) -> Result<(), CoreError> {
    if !LEAVE_TYPES.contains(&leave_type) {
        return Err(CoreError::Validation(format!(
            "Invalid leave type '{leave_type}'. Must be one of: {}",
            LEAVE_TYPES.join(", ")
        )));
    }
    if end < start {
        return Err(CoreError::Validation(
            "endDate must not be before startDate".into(),
        ));
    }
    Ok(())
}

/// Inclusive number of calendar days covered by the request.
pub fn duration_days(start: Date, end: Date) -> i64 {
    (end - start).num_days() + 1
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::roles::{ROLE_MANAGER, ROLE_STAFF};
    use crate::workflow::{ensure_state, TransitionContext};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn manager_can_approve_pending() {
        let ctx = TransitionContext::role_only(ROLE_MANAGER);
        assert!(LEAVE_TRANSITIONS
            .check(LeaveStatus::Pending, LeaveStatus::Approved, &ctx)
            .is_ok());
    }

    #[test]
    fn deciding_twice_is_invalid() {
        let ctx = TransitionContext::role_only(ROLE_ADMIN);
        for from in [LeaveStatus::Approved, LeaveStatus::Rejected] {
            for to in [LeaveStatus::Approved, LeaveStatus::Rejected] {
                assert_matches!(
                    LEAVE_TRANSITIONS.check(from, to, &ctx),
                    Err(CoreError::InvalidTransition { .. })
                );
            }
        }
    }

    #[test]
    fn staff_cannot_decide_even_own_request() {
        let ctx = TransitionContext {
            role: ROLE_STAFF,
            is_owner: true,
            is_member: false,
        };
        assert_matches!(
            LEAVE_TRANSITIONS.check(LeaveStatus::Pending, LeaveStatus::Approved, &ctx),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn moving_back_to_pending_is_invalid() {
        let ctx = TransitionContext::role_only(ROLE_ADMIN);
        assert_matches!(
            LEAVE_TRANSITIONS.check(LeaveStatus::Approved, LeaveStatus::Pending, &ctx),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn only_pending_is_editable() {
        assert!(ensure_state("Leave", LeaveStatus::Pending, EDITABLE_STATES, "edited").is_ok());
        assert!(ensure_state("Leave", LeaveStatus::Approved, EDITABLE_STATES, "edited").is_err());
        assert!(ensure_state("Leave", LeaveStatus::Rejected, EDITABLE_STATES, "edited").is_err());
    }

    #[test]
    fn edit_rule_admits_owner_and_supervisors() {
        let owner = TransitionContext {
            role: ROLE_STAFF,
            is_owner: true,
            is_member: false,
        };
        assert!(EDIT_RULE.admits(&owner));
        assert!(EDIT_RULE.admits(&TransitionContext::role_only(ROLE_MANAGER)));
        assert!(!EDIT_RULE.admits(&TransitionContext::role_only(ROLE_STAFF)));
        assert!(!DELETE_RULE.admits(&TransitionContext::role_only(ROLE_MANAGER)));
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(validate_request("annual", date("2026-03-02"), date("2026-03-01")).is_err());
        assert!(validate_request("annual", date("2026-03-01"), date("2026-03-01")).is_ok());
        assert!(validate_request("sabbatical", date("2026-03-01"), date("2026-03-02")).is_err());
    }

    #[test]
    fn duration_is_inclusive() {
        assert_eq!(duration_days(date("2026-03-01"), date("2026-03-01")), 1);
        assert_eq!(duration_days(date("2026-03-01"), date("2026-03-05")), 5);
    }
}
