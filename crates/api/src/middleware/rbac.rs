//! Bridge from the authenticated caller to the declarative policy table.
//!
//! Handlers call [`AuthUser::authorize`] as their first step, before any
//! lookup, so a denied caller learns nothing about the target resource.

use crewline_core::policy::{self, Action, Actor};
use crewline_core::roles::SUPERVISORS;
use crewline_core::types::DbId;
use crewline_core::workflow::TransitionContext;

use super::auth::AuthUser;
use crate::error::AppResult;

impl AuthUser {
    pub fn actor(&self) -> Actor<'_> {
        Actor {
            role: &self.role,
            permissions: &self.permissions,
        }
    }

    /// Reject with 403 unless the policy grants `action`.
    pub fn authorize(&self, action: Action) -> AppResult<()> {
        policy::authorize(&self.actor(), action)?;
        Ok(())
    }

    /// Whether the policy grants `action`, without failing.
    pub fn can(&self, action: Action) -> bool {
        policy::can(&self.actor(), action)
    }

    pub fn is_supervisor(&self) -> bool {
        SUPERVISORS.contains(&self.role.as_str())
    }

    /// Transition context for an entity owned by `owner_id`.
    pub fn context_for_owner(&self, owner_id: Option<DbId>) -> TransitionContext<'_> {
        TransitionContext {
            role: &self.role,
            is_owner: owner_id == Some(self.user_id),
            is_member: false,
        }
    }

    /// Transition context for an entity whose assigned members may act.
    pub fn context_as_member(&self, is_member: bool) -> TransitionContext<'_> {
        TransitionContext {
            role: &self.role,
            is_owner: false,
            is_member,
        }
    }
}
