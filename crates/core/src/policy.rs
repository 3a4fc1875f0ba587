//! Declarative authorization policy.
//!
//! Every guarded action has exactly one row in [`POLICY`]. An actor is
//! allowed when its role is listed for the action or when its token carries
//! the action's permission string. Handlers call [`authorize`] before looking
//! anything up so that a `403` never reveals whether the target exists.

use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, ROLE_MANAGER, ROLE_STAFF};

/// Permission strings embedded in access tokens.
pub mod permissions {
    pub const USER_READ: &str = "user:read";
    pub const USER_MANAGE: &str = "user:manage";
    pub const CLIENT_READ: &str = "client:read";
    pub const CLIENT_APPROVE: &str = "client:approve";
    pub const TEAM_MANAGE: &str = "team:manage";
    pub const PROJECT_MANAGE: &str = "project:manage";
    pub const LEAVE_READ_ALL: &str = "leave:read:all";
    pub const LEAVE_DECIDE: &str = "leave:decide";
    pub const PROPOSAL_READ_ALL: &str = "proposal:read:all";
    pub const PROPOSAL_DECIDE: &str = "proposal:decide";
    pub const HSE_REPORTS_VIEW: &str = "hse:reports:view";
    pub const HSE_REPORTS_MANAGE: &str = "hse:reports:manage";
    pub const HSE_DOCUMENTS_MANAGE: &str = "hse:documents:manage";
    pub const FINANCE_VIEW: &str = "finance:view";
    pub const FINANCE_MANAGE: &str = "finance:manage";
    pub const AUDIT_VIEW: &str = "audit:view";
}

/// A guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UserRead,
    UserManage,
    ClientRead,
    ClientApprove,
    TeamRead,
    TeamManage,
    ProjectRead,
    ProjectManage,
    TaskManage,
    LeaveRequest,
    LeaveReadAll,
    LeaveDecide,
    ProposalCreate,
    ProposalReadAll,
    ProposalDecide,
    HseReportCreate,
    HseReportView,
    HseReportManage,
    HseDocumentView,
    HseDocumentManage,
    FinanceView,
    FinanceManage,
    AuditView,
}

/// What an actor needs to hold to perform an [`Action`].
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub roles: &'static [&'static str],
    pub permission: Option<&'static str>,
}

const ALL_STAFF: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER, ROLE_STAFF];
const SUPERVISORS: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER];
const ADMIN_ONLY: &[&str] = &[ROLE_ADMIN];

const fn req(roles: &'static [&'static str], permission: Option<&'static str>) -> Requirement {
    Requirement { roles, permission }
}

/// The policy table.
pub const POLICY: &[(Action, Requirement)] = &[
    (Action::UserRead, req(SUPERVISORS, Some(permissions::USER_READ))),
    (Action::UserManage, req(ADMIN_ONLY, Some(permissions::USER_MANAGE))),
    (Action::ClientRead, req(SUPERVISORS, Some(permissions::CLIENT_READ))),
    (Action::ClientApprove, req(ADMIN_ONLY, Some(permissions::CLIENT_APPROVE))),
    (Action::TeamRead, req(ALL_STAFF, None)),
    (Action::TeamManage, req(SUPERVISORS, Some(permissions::TEAM_MANAGE))),
    (Action::ProjectRead, req(ALL_STAFF, None)),
    (Action::ProjectManage, req(SUPERVISORS, Some(permissions::PROJECT_MANAGE))),
    (Action::TaskManage, req(SUPERVISORS, Some(permissions::PROJECT_MANAGE))),
    (Action::LeaveRequest, req(ALL_STAFF, None)),
    (Action::LeaveReadAll, req(SUPERVISORS, Some(permissions::LEAVE_READ_ALL))),
    (Action::LeaveDecide, req(SUPERVISORS, Some(permissions::LEAVE_DECIDE))),
    (Action::ProposalCreate, req(ALL_STAFF, None)),
    (Action::ProposalReadAll, req(SUPERVISORS, Some(permissions::PROPOSAL_READ_ALL))),
    (Action::ProposalDecide, req(SUPERVISORS, Some(permissions::PROPOSAL_DECIDE))),
    (Action::HseReportCreate, req(ALL_STAFF, None)),
    (Action::HseReportView, req(SUPERVISORS, Some(permissions::HSE_REPORTS_VIEW))),
    (Action::HseReportManage, req(SUPERVISORS, Some(permissions::HSE_REPORTS_MANAGE))),
    (Action::HseDocumentView, req(ALL_STAFF, None)),
    (Action::HseDocumentManage, req(SUPERVISORS, Some(permissions::HSE_DOCUMENTS_MANAGE))),
    (Action::FinanceView, req(SUPERVISORS, Some(permissions::FINANCE_VIEW))),
    (Action::FinanceManage, req(SUPERVISORS, Some(permissions::FINANCE_MANAGE))),
    (Action::AuditView, req(ADMIN_ONLY, Some(permissions::AUDIT_VIEW))),
];

/// The caller as seen by the policy: a role plus token permissions.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub role: &'a str,
    pub permissions: &'a [String],
}

/// Look up the requirement row for an action.
pub fn requirement(action: Action) -> Option<&'static Requirement> {
    POLICY
        .iter()
        .find(|(candidate, _)| *candidate == action)
        .map(|(_, requirement)| requirement)
}

/// Whether `actor` may perform `action`. Unlisted actions are denied.
pub fn can(actor: &Actor<'_>, action: Action) -> bool {
    let Some(requirement) = requirement(action) else {
        return false;
    };
    if requirement.roles.contains(&actor.role) {
        return true;
    }
    requirement
        .permission
        .is_some_and(|needed| actor.permissions.iter().any(|held| held == needed))
}

/// [`can`] as a `Result`, producing a `Forbidden` error on denial.
pub fn authorize(actor: &Actor<'_>, action: Action) -> Result<(), CoreError> {
    if can(actor, action) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "Role '{}' is not permitted to perform {action:?}",
            actor.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::ROLE_CLIENT;

    fn actor<'a>(role: &'a str, permissions: &'a [String]) -> Actor<'a> {
        Actor { role, permissions }
    }

    #[test]
    fn every_action_has_exactly_one_row() {
        let actions = [
            Action::UserRead,
            Action::UserManage,
            Action::ClientRead,
            Action::ClientApprove,
            Action::TeamRead,
            Action::TeamManage,
            Action::ProjectRead,
            Action::ProjectManage,
            Action::TaskManage,
            Action::LeaveRequest,
            Action::LeaveReadAll,
            Action::LeaveDecide,
            Action::ProposalCreate,
            Action::ProposalReadAll,
            Action::ProposalDecide,
            Action::HseReportCreate,
            Action::HseReportView,
            Action::HseReportManage,
            Action::HseDocumentView,
            Action::HseDocumentManage,
            Action::FinanceView,
            Action::FinanceManage,
            Action::AuditView,
        ];
        for action in actions {
            let rows = POLICY.iter().filter(|(a, _)| *a == action).count();
            assert_eq!(rows, 1, "{action:?}");
        }
    }

    #[test]
    fn roles_grant_listed_actions() {
        assert!(can(&actor(ROLE_ADMIN, &[]), Action::AuditView));
        assert!(can(&actor(ROLE_MANAGER, &[]), Action::LeaveDecide));
        assert!(!can(&actor(ROLE_STAFF, &[]), Action::LeaveDecide));
        assert!(can(&actor(ROLE_STAFF, &[]), Action::LeaveRequest));
    }

    #[test]
    fn permission_string_grants_without_role() {
        let perms = vec![permissions::HSE_REPORTS_VIEW.to_string()];
        assert!(can(&actor(ROLE_STAFF, &perms), Action::HseReportView));
        assert!(!can(&actor(ROLE_STAFF, &perms), Action::HseReportManage));
    }

    #[test]
    fn clients_hold_no_staff_actions() {
        assert!(!can(&actor(ROLE_CLIENT, &[]), Action::ProjectRead));
        assert!(!can(&actor(ROLE_CLIENT, &[]), Action::LeaveRequest));
    }

    #[test]
    fn authorize_reports_forbidden() {
        let err = authorize(&actor(ROLE_STAFF, &[]), Action::UserManage).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
