//! Explicit status transition tables.
//!
//! Each entity with an approval workflow declares a [`TransitionTable`]: a
//! static list of `{from states} -> {to states}` edges, each guarded by an
//! [`ActorRule`]. Handlers consult the table through [`TransitionTable::check`]
//! instead of re-deriving the rule inline.
//!
//! Check order:
//!
//! 1. The target is unreachable in the table at all -> `InvalidTransition`.
//! 2. No edge into the target admits the actor -> `Forbidden`.
//! 3. An admitting edge exists but none starts at the current state ->
//!    `InvalidTransition`.

use std::fmt::Display;

use crate::error::CoreError;

/// Who may perform a transition.
#[derive(Debug, Clone, Copy)]
pub enum ActorRule {
    /// The user that owns (created / submitted) the entity.
    Owner,
    /// A user assigned to the entity (e.g. project team member).
    Member,
    /// Any user holding one of the listed roles.
    Roles(&'static [&'static str]),
    /// The owner, or any user holding one of the listed roles.
    OwnerOr(&'static [&'static str]),
    /// A member, or any user holding one of the listed roles.
    MemberOr(&'static [&'static str]),
}

impl ActorRule {
    pub fn admits(&self, ctx: &TransitionContext<'_>) -> bool {
        match self {
            ActorRule::Owner => ctx.is_owner,
            ActorRule::Member => ctx.is_member,
            ActorRule::Roles(roles) => roles.contains(&ctx.role),
            ActorRule::OwnerOr(roles) => ctx.is_owner || roles.contains(&ctx.role),
            ActorRule::MemberOr(roles) => ctx.is_member || roles.contains(&ctx.role),
        }
    }
}

/// Facts about the caller relative to the entity being transitioned.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub role: &'a str,
    pub is_owner: bool,
    pub is_member: bool,
}

impl<'a> TransitionContext<'a> {
    /// A caller with a role and no ownership or membership relation.
    pub fn role_only(role: &'a str) -> Self {
        Self {
            role,
            is_owner: false,
            is_member: false,
        }
    }
}

/// A single edge set in a transition table.
#[derive(Debug)]
pub struct Transition<S: 'static> {
    pub from: &'static [S],
    pub to: &'static [S],
    pub rule: ActorRule,
}

/// The complete set of legal transitions for one entity's status field.
#[derive(Debug)]
pub struct TransitionTable<S: 'static> {
    /// Entity name used in error messages.
    pub entity: &'static str,
    pub transitions: &'static [Transition<S>],
}

impl<S> TransitionTable<S>
where
    S: Copy + PartialEq + Display,
{
    /// Validate moving from `from` to `to` on behalf of the caller in `ctx`.
    pub fn check(&self, from: S, to: S, ctx: &TransitionContext<'_>) -> Result<(), CoreError> {
        let mut reachable = false;
        let mut admitted = false;

        for transition in self.transitions.iter().filter(|t| t.to.contains(&to)) {
            reachable = true;
            if !transition.rule.admits(ctx) {
                continue;
            }
            admitted = true;
            if transition.from.contains(&from) {
                return Ok(());
            }
        }

        if reachable && !admitted {
            return Err(CoreError::Forbidden(format!(
                "Not permitted to set {} status to '{to}'",
                self.entity
            )));
        }

        Err(CoreError::InvalidTransition {
            entity: self.entity,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Guard an edit or delete that is only legal while the entity is in one of
/// `allowed` states.
pub fn ensure_state<S>(
    entity: &'static str,
    current: S,
    allowed: &[S],
    action: &'static str,
) -> Result<(), CoreError>
where
    S: Copy + PartialEq + Display,
{
    if allowed.contains(&current) {
        Ok(())
    } else {
        Err(CoreError::InvalidState {
            entity,
            state: current.to_string(),
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::define_text_status;
    use crate::roles::{ROLE_ADMIN, ROLE_STAFF};

    define_text_status! {
        Door {
            Closed => "closed",
            Open => "open",
            Locked => "locked",
        }
    }

    const DOORS: TransitionTable<Door> = TransitionTable {
        entity: "Door",
        transitions: &[
            Transition {
                from: &[Door::Closed],
                to: &[Door::Open],
                rule: ActorRule::Owner,
            },
            Transition {
                from: &[Door::Closed],
                to: &[Door::Locked],
                rule: ActorRule::Roles(&[ROLE_ADMIN]),
            },
        ],
    };

    fn owner() -> TransitionContext<'static> {
        TransitionContext {
            role: ROLE_STAFF,
            is_owner: true,
            is_member: false,
        }
    }

    #[test]
    fn admitted_transition_from_listed_state_passes() {
        assert!(DOORS.check(Door::Closed, Door::Open, &owner()).is_ok());
    }

    #[test]
    fn actor_not_admitted_is_forbidden() {
        let ctx = TransitionContext::role_only(ROLE_STAFF);
        assert_matches!(
            DOORS.check(Door::Closed, Door::Locked, &ctx),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn wrong_source_state_is_invalid_transition() {
        let result = DOORS.check(Door::Open, Door::Open, &owner());
        assert_matches!(
            result,
            Err(CoreError::InvalidTransition { entity: "Door", ref from, ref to })
                if from == "open" && to == "open"
        );
    }

    #[test]
    fn unreachable_target_is_invalid_even_for_admin() {
        let ctx = TransitionContext::role_only(ROLE_ADMIN);
        assert_matches!(
            DOORS.check(Door::Open, Door::Closed, &ctx),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn ensure_state_rejects_other_states() {
        assert!(ensure_state("Door", Door::Closed, &[Door::Closed], "edited").is_ok());
        assert_matches!(
            ensure_state("Door", Door::Locked, &[Door::Closed], "edited"),
            Err(CoreError::InvalidState { action: "edited", .. })
        );
    }
}
