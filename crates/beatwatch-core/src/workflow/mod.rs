//! Per-entity finite-state machines
//!
//! - `states`: the status enums and their transition tables
//! - `guard`: cross-entity preconditions on individual edges
//! - `validator`: the single entry point used before any status write

pub mod guard;
pub mod states;
pub mod validator;

pub use guard::{Guard, GuardContext, NoEvidence};
pub use states::{
    normalize_state, transition_table, AlertStatus, PersonStatus, RegistrationStatus,
    VerificationRequestStatus, VisitStatus, WorkflowState,
};
pub use validator::{parse_state, validate, validate_transition, Transition, TransitionContext};

/// Entity kinds that carry a workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    VerificationRequest,
    Visit,
    EmergencyAlert,
    Registration,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "Person",
            EntityKind::VerificationRequest => "VerificationRequest",
            EntityKind::Visit => "Visit",
            EntityKind::EmergencyAlert => "EmergencyAlert",
            EntityKind::Registration => "Registration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "PERSON" | "CITIZEN" => Some(EntityKind::Person),
            "VERIFICATIONREQUEST" | "VERIFICATION" => Some(EntityKind::VerificationRequest),
            "VISIT" => Some(EntityKind::Visit),
            "EMERGENCYALERT" | "ALERT" | "SOS" => Some(EntityKind::EmergencyAlert),
            "REGISTRATION" => Some(EntityKind::Registration),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
