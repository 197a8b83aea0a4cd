//! Status enumerations and their compiled transition tables
//!
//! Each entity kind owns a closed set of states. `next_states` is the
//! transition table: a `match` from each state to the slice of legal next
//! states. Edges that need cross-entity evidence name a [`Guard`].

use serde::{Deserialize, Serialize};

use super::guard::Guard;
use super::EntityKind;

/// Canonical form used to compare state spellings
///
/// `"PENDING_REVIEW"`, `"pending review"` and `"PendingReview"` all
/// normalise to `"PENDINGREVIEW"`.
pub fn normalize_state(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .collect::<String>()
        .to_ascii_uppercase()
}

/// A finite-state-machine state for one entity kind
pub trait WorkflowState:
    Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Every state of the kind, in declaration order
    fn all() -> &'static [Self];

    /// Canonical spelling, also the persisted representation
    fn as_str(&self) -> &'static str;

    /// Legal next states
    fn next_states(&self) -> &'static [Self];

    /// Extra spellings accepted by `parse`, given the normalised input
    fn alias(_normalized: &str) -> Option<Self> {
        None
    }

    /// Precondition attached to the edge `self → next`, if any
    fn guard(&self, _next: Self) -> Option<Guard> {
        None
    }

    fn parse(s: &str) -> Option<Self> {
        let norm = normalize_state(s);
        Self::all()
            .iter()
            .copied()
            .find(|st| normalize_state(st.as_str()) == norm)
            .or_else(|| Self::alias(&norm))
    }

    fn can_transition_to(&self, next: Self) -> bool {
        self.next_states().contains(&next)
    }

    fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

/// Lifecycle status of a person under watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonStatus {
    Pending,
    /// Also spelled `Approved`
    Verified,
    Rejected,
    Inactive,
    Deceased,
}

impl WorkflowState for PersonStatus {
    const KIND: EntityKind = EntityKind::Person;

    fn all() -> &'static [Self] {
        use PersonStatus::*;
        &[Pending, Verified, Rejected, Inactive, Deceased]
    }

    fn as_str(&self) -> &'static str {
        match self {
            PersonStatus::Pending => "Pending",
            PersonStatus::Verified => "Verified",
            PersonStatus::Rejected => "Rejected",
            PersonStatus::Inactive => "Inactive",
            PersonStatus::Deceased => "Deceased",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        use PersonStatus::*;
        match self {
            Pending => &[Verified, Rejected],
            Verified => &[Inactive, Deceased],
            Rejected | Inactive | Deceased => &[],
        }
    }

    fn alias(normalized: &str) -> Option<Self> {
        match normalized {
            "APPROVED" => Some(PersonStatus::Verified),
            _ => None,
        }
    }
}

impl PersonStatus {
    /// Whether a person in this status counts as active for the roster
    pub fn is_active(&self) -> bool {
        !matches!(self, PersonStatus::Inactive | PersonStatus::Deceased)
    }
}

/// Status of a verification request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationRequestStatus {
    Pending,
    InProgress,
    Approved,
    Rejected,
}

impl WorkflowState for VerificationRequestStatus {
    const KIND: EntityKind = EntityKind::VerificationRequest;

    fn all() -> &'static [Self] {
        use VerificationRequestStatus::*;
        &[Pending, InProgress, Approved, Rejected]
    }

    fn as_str(&self) -> &'static str {
        match self {
            VerificationRequestStatus::Pending => "Pending",
            VerificationRequestStatus::InProgress => "InProgress",
            VerificationRequestStatus::Approved => "Approved",
            VerificationRequestStatus::Rejected => "Rejected",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        use VerificationRequestStatus::*;
        match self {
            Pending => &[InProgress],
            InProgress => &[Approved, Rejected],
            Approved | Rejected => &[],
        }
    }
}

/// Status of a scheduled visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkflowState for VisitStatus {
    const KIND: EntityKind = EntityKind::Visit;

    fn all() -> &'static [Self] {
        use VisitStatus::*;
        &[Scheduled, InProgress, Completed, Cancelled]
    }

    fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "Scheduled",
            VisitStatus::InProgress => "InProgress",
            VisitStatus::Completed => "Completed",
            VisitStatus::Cancelled => "Cancelled",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        use VisitStatus::*;
        match self {
            Scheduled => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl VisitStatus {
    /// Scheduled or in progress: counts towards workload and blocks its slot
    pub fn is_open(&self) -> bool {
        matches!(self, VisitStatus::Scheduled | VisitStatus::InProgress)
    }
}

/// Status of an emergency alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    Active,
    Responded,
    Resolved,
    FalseAlarm,
}

impl WorkflowState for AlertStatus {
    const KIND: EntityKind = EntityKind::EmergencyAlert;

    fn all() -> &'static [Self] {
        use AlertStatus::*;
        &[Active, Responded, Resolved, FalseAlarm]
    }

    fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "Active",
            AlertStatus::Responded => "Responded",
            AlertStatus::Resolved => "Resolved",
            AlertStatus::FalseAlarm => "FalseAlarm",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        use AlertStatus::*;
        match self {
            Active => &[Responded, FalseAlarm],
            Responded => &[Resolved],
            Resolved | FalseAlarm => &[],
        }
    }
}

/// Status of a self-service registration draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    InProgress,
    PendingReview,
    Approved,
    Rejected,
}

impl WorkflowState for RegistrationStatus {
    const KIND: EntityKind = EntityKind::Registration;

    fn all() -> &'static [Self] {
        use RegistrationStatus::*;
        &[InProgress, PendingReview, Approved, Rejected]
    }

    fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::InProgress => "InProgress",
            RegistrationStatus::PendingReview => "PendingReview",
            RegistrationStatus::Approved => "Approved",
            RegistrationStatus::Rejected => "Rejected",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        use RegistrationStatus::*;
        match self {
            InProgress => &[PendingReview],
            PendingReview => &[Approved, Rejected],
            Rejected => &[PendingReview, InProgress],
            Approved => &[],
        }
    }

    fn guard(&self, next: Self) -> Option<Guard> {
        match (self, next) {
            (RegistrationStatus::PendingReview, RegistrationStatus::Approved) => {
                Some(Guard::CompletedVerificationVisit)
            }
            _ => None,
        }
    }
}

/// The full table of a kind as `(state, legal next states)` rows
pub fn transition_table<S: WorkflowState>() -> Vec<(S, &'static [S])> {
    S::all().iter().map(|s| (*s, s.next_states())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_state_spellings() {
        assert_eq!(normalize_state("PENDING_REVIEW"), "PENDINGREVIEW");
        assert_eq!(normalize_state(" pending review "), "PENDINGREVIEW");
        assert_eq!(normalize_state("False-Alarm"), "FALSEALARM");
    }

    #[test]
    fn test_parse_accepts_legacy_spellings() {
        assert_eq!(VisitStatus::parse("IN_PROGRESS"), Some(VisitStatus::InProgress));
        assert_eq!(AlertStatus::parse("FalseAlarm"), Some(AlertStatus::FalseAlarm));
        assert_eq!(
            RegistrationStatus::parse("PENDING_REVIEW"),
            Some(RegistrationStatus::PendingReview)
        );
        assert_eq!(VisitStatus::parse("RESCHEDULED"), None);
    }

    #[test]
    fn test_person_approved_is_verified() {
        assert_eq!(PersonStatus::parse("APPROVED"), Some(PersonStatus::Verified));
        assert_eq!(PersonStatus::parse("Verified"), Some(PersonStatus::Verified));
        assert_eq!(VisitStatus::parse("APPROVED"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(PersonStatus::Deceased.is_terminal());
        assert!(VerificationRequestStatus::Approved.is_terminal());
        assert!(VerificationRequestStatus::Rejected.is_terminal());
        assert!(VisitStatus::Completed.is_terminal());
        assert!(VisitStatus::Cancelled.is_terminal());
        assert!(AlertStatus::Resolved.is_terminal());
        assert!(AlertStatus::FalseAlarm.is_terminal());
        assert!(RegistrationStatus::Approved.is_terminal());
        assert!(!RegistrationStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_only_registration_approval_is_guarded() {
        for (from, nexts) in transition_table::<RegistrationStatus>() {
            for to in nexts {
                let guarded = from.guard(*to).is_some();
                assert_eq!(
                    guarded,
                    from == RegistrationStatus::PendingReview
                        && *to == RegistrationStatus::Approved
                );
            }
        }
        for (from, nexts) in transition_table::<VisitStatus>() {
            assert!(nexts.iter().all(|to| from.guard(*to).is_none()));
        }
    }

    #[test]
    fn test_open_visit_states() {
        assert!(VisitStatus::Scheduled.is_open());
        assert!(VisitStatus::InProgress.is_open());
        assert!(!VisitStatus::Completed.is_open());
        assert!(!VisitStatus::Cancelled.is_open());
    }
}
