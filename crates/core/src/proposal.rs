//! Proposal workflow: the one multi-step linear workflow.
//!
//! ```text
//! Draft --(owner)--> Submitted --(admin|manager)--> Approved | Rejected | Won | Lost
//! ```
//!
//! Drafts are edited only by their author; `Draft` and `Rejected` proposals
//! may be deleted by their author.

use crate::define_text_status;
use crate::error::CoreError;
use crate::roles::SUPERVISORS;
use crate::workflow::{ActorRule, Transition, TransitionTable};

define_text_status! {
    /// Proposal lifecycle status.
    ProposalStatus {
        Draft => "Draft",
        Submitted => "Submitted",
        Approved => "Approved",
        Rejected => "Rejected",
        Won => "Won",
        Lost => "Lost",
    }
}

/// Terminal outcomes a supervisor may record on a submitted proposal.
pub const DECISIONS: &[ProposalStatus] = &[
    ProposalStatus::Approved,
    ProposalStatus::Rejected,
    ProposalStatus::Won,
    ProposalStatus::Lost,
];

pub const PROPOSAL_TRANSITIONS: TransitionTable<ProposalStatus> = TransitionTable {
    entity: "Proposal",
    transitions: &[
        Transition {
            from: &[ProposalStatus::Draft],
            to: &[ProposalStatus::Submitted],
            rule: ActorRule::Owner,
        },
        Transition {
            from: &[ProposalStatus::Submitted],
            to: DECISIONS,
            rule: ActorRule::Roles(SUPERVISORS),
        },
    ],
};

/// States in which the author may still edit the proposal body.
pub const EDITABLE_STATES: &[ProposalStatus] = &[ProposalStatus::Draft];

/// States from which the author may delete the proposal.
pub const DELETABLE_STATES: &[ProposalStatus] =
    &[ProposalStatus::Draft, ProposalStatus::Rejected];

/// Validate a proposal's monetary value.
pub fn validate_value(value: f64) -> Result<(), CoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::Validation(
            "value must be a non-negative number".into(),
        ));
    }
    Ok(())
}
