//! Health, safety and environment (HSE) reporting rules.

use crate::define_text_status;
use crate::roles::SUPERVISORS;
use crate::workflow::{ActorRule, Transition, TransitionTable};

define_text_status! {
    /// Incident severity as reported by the filer.
    Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

define_text_status! {
    /// Incident report handling status.
    HseReportStatus {
        Open => "open",
        Investigating => "investigating",
        Closed => "closed",
    }
}

/// Document categories accepted for HSE compliance uploads.
pub const DOCUMENT_CATEGORIES: &[&str] = &["policy", "procedure", "certificate", "risk_assessment", "other"];

pub const HSE_REPORT_TRANSITIONS: TransitionTable<HseReportStatus> = TransitionTable {
    entity: "HseReport",
    transitions: &[
        Transition {
            from: &[HseReportStatus::Open],
            to: &[HseReportStatus::Investigating, HseReportStatus::Closed],
            rule: ActorRule::Roles(SUPERVISORS),
        },
        Transition {
            from: &[HseReportStatus::Investigating],
            to: &[HseReportStatus::Closed],
            rule: ActorRule::Roles(SUPERVISORS),
        },
        Transition {
            from: &[HseReportStatus::Closed],
            to: &[HseReportStatus::Open],
            rule: ActorRule::Roles(SUPERVISORS),
        },
    ],
};

impl Severity {
    /// High and critical incidents are escalated to every supervisor by email.
    pub fn requires_escalation(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}
