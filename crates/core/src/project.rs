//! Project and task status rules.
//!
//! Project status moves freely between the four board columns, but only for
//! members assigned to the project (through a team membership scoped to it)
//! or admins. Entering `Done` from another state is the completion event that
//! notifies the project's clients; re-setting `Done` is a no-op.

use crate::define_text_status;
use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, SUPERVISORS};
use crate::types::Date;
use crate::workflow::{ActorRule, Transition, TransitionTable};

define_text_status! {
    /// Project board status.
    ProjectStatus {
        ToDo => "To Do",
        InProgress => "In Progress",
        Review => "Review",
        Done => "Done",
    }
}

define_text_status! {
    /// Task board status, independent of the parent project's status.
    TaskStatus {
        ToDo => "To Do",
        InProgress => "In Progress",
        Review => "Review",
        Done => "Done",
    }
}

pub const PROJECT_TRANSITIONS: TransitionTable<ProjectStatus> = TransitionTable {
    entity: "Project",
    transitions: &[Transition {
        from: ProjectStatus::ALL,
        to: ProjectStatus::ALL,
        rule: ActorRule::MemberOr(&[ROLE_ADMIN]),
    }],
};

/// Tasks are moved by their assignee (the "owner" in the transition
/// context) or by a supervisor.
pub const TASK_TRANSITIONS: TransitionTable<TaskStatus> = TransitionTable {
    entity: "Task",
    transitions: &[Transition {
        from: TaskStatus::ALL,
        to: TaskStatus::ALL,
        rule: ActorRule::OwnerOr(SUPERVISORS),
    }],
};

/// Whether moving `from -> to` is the completion event.
pub fn is_completion(from: ProjectStatus, to: ProjectStatus) -> bool {
    to == ProjectStatus::Done && from != ProjectStatus::Done
}

/// Validate that an optional due date does not precede the start date.
pub fn validate_schedule(start: Option<Date>, due: Option<Date>) -> Result<(), CoreError> {
    if let (Some(start), Some(due)) = (start, due) {
        if due < start {
            return Err(CoreError::Validation(
                "dueDate must not be before startDate".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::roles::{ROLE_MANAGER, ROLE_STAFF};
    use crate::workflow::TransitionContext;

    fn member() -> TransitionContext<'static> {
        TransitionContext {
            role: ROLE_STAFF,
            is_owner: false,
            is_member: true,
        }
    }

    #[test]
    fn member_may_move_between_any_columns() {
        for from in ProjectStatus::ALL {
            for to in ProjectStatus::ALL {
                assert!(PROJECT_TRANSITIONS.check(*from, *to, &member()).is_ok());
            }
        }
    }

    #[test]
    fn unassigned_manager_is_forbidden() {
        let ctx = TransitionContext::role_only(ROLE_MANAGER);
        assert_matches!(
            PROJECT_TRANSITIONS.check(ProjectStatus::ToDo, ProjectStatus::Done, &ctx),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn admin_may_move_without_membership() {
        let ctx = TransitionContext::role_only(ROLE_ADMIN);
        assert!(PROJECT_TRANSITIONS
            .check(ProjectStatus::Review, ProjectStatus::Done, &ctx)
            .is_ok());
    }

    #[test]
    fn completion_fires_only_on_entry_into_done() {
        assert!(is_completion(ProjectStatus::Review, ProjectStatus::Done));
        assert!(is_completion(ProjectStatus::ToDo, ProjectStatus::Done));
        assert!(!is_completion(ProjectStatus::Done, ProjectStatus::Done));
        assert!(!is_completion(ProjectStatus::Done, ProjectStatus::Review));
    }

    #[test]
    fn task_assignee_or_supervisor_moves_task() {
        let assignee = TransitionContext {
            role: ROLE_STAFF,
            is_owner: true,
            is_member: false,
        };
        assert!(TASK_TRANSITIONS
            .check(TaskStatus::ToDo, TaskStatus::InProgress, &assignee)
            .is_ok());
        assert_matches!(
            TASK_TRANSITIONS.check(
                TaskStatus::ToDo,
                TaskStatus::InProgress,
                &TransitionContext::role_only(ROLE_STAFF)
            ),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn inverted_schedule_rejected() {
        let start: Date = "2026-04-10".parse().unwrap();
        let due: Date = "2026-04-01".parse().unwrap();
        assert!(validate_schedule(Some(start), Some(due)).is_err());
        assert!(validate_schedule(Some(due), Some(start)).is_ok());
        assert!(validate_schedule(None, Some(due)).is_ok());
    }
}
