//! Transition validation
//!
//! Order of checks: normalise both states, accept a same-state request as a
//! no-op, reject edges missing from the table (naming the legal next
//! states), then evaluate the edge's guard if it has one.

use super::guard::{Guard, GuardContext};
use super::states::{
    AlertStatus, PersonStatus, RegistrationStatus, VerificationRequestStatus, VisitStatus,
    WorkflowState,
};
use super::EntityKind;
use crate::errors::{BeatwatchError, BwError};

/// Outcome of a successful validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Requested state equals the current one; nothing to write
    NoOp(S),
    Apply { from: S, to: S },
}

impl<S: Copy> Transition<S> {
    pub fn target(&self) -> S {
        match self {
            Transition::NoOp(s) => *s,
            Transition::Apply { to, .. } => *to,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Transition::NoOp(_))
    }
}

/// Facts a guard may need about the entity being transitioned
pub struct TransitionContext<'a> {
    /// Person linked to the entity (registrations only)
    pub linked_person_id: Option<&'a str>,
    pub guards: &'a dyn GuardContext,
}

impl<'a> TransitionContext<'a> {
    pub fn new(guards: &'a dyn GuardContext) -> Self {
        Self {
            linked_person_id: None,
            guards,
        }
    }

    pub fn with_linked_person(mut self, person_id: Option<&'a str>) -> Self {
        self.linked_person_id = person_id;
        self
    }
}

/// Parse a status string for kind `S`
///
/// # Errors
///
/// `BwErrorKind::UnknownState` when the string names no state of the kind.
#[allow(clippy::result_large_err)]
pub fn parse_state<S: WorkflowState>(s: &str) -> Result<S, BwError> {
    S::parse(s).ok_or_else(|| {
        BeatwatchError::UnknownState {
            kind: S::KIND,
            state: s.to_string(),
        }
        .into()
    })
}

/// Validate `from → to` for a typed state
///
/// # Errors
///
/// - `BwErrorKind::InvalidTransition` when the edge is not in the table
/// - `BwErrorKind::GuardUnmet` when the edge's precondition fails
/// - whatever the guard context returns if evidence cannot be read
#[allow(clippy::result_large_err)]
pub fn validate<S: WorkflowState>(
    from: S,
    to: S,
    ctx: &TransitionContext<'_>,
) -> Result<Transition<S>, BwError> {
    if from == to {
        return Ok(Transition::NoOp(from));
    }

    if !from.can_transition_to(to) {
        return Err(BeatwatchError::InvalidTransition {
            kind: S::KIND,
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            allowed: from
                .next_states()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        }
        .into());
    }

    if let Some(guard) = from.guard(to) {
        check_guard(guard, ctx).map_err(|precondition| -> BwError {
            match precondition {
                GuardFailure::Unmet(precondition) => BeatwatchError::GuardUnmet {
                    kind: S::KIND,
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                    precondition,
                }
                .into(),
                GuardFailure::Evidence(err) => err,
            }
        })?;
    }

    Ok(Transition::Apply { from, to })
}

/// String-level entry point: `validate_transition(kind, from, to, ctx)`
///
/// # Errors
///
/// `BwErrorKind::UnknownState` for unparseable states, otherwise as
/// [`validate`].
#[allow(clippy::result_large_err)]
pub fn validate_transition(
    kind: EntityKind,
    from: &str,
    to: &str,
    ctx: &TransitionContext<'_>,
) -> Result<(), BwError> {
    fn run<S: WorkflowState>(from: &str, to: &str, ctx: &TransitionContext<'_>) -> Result<(), BwError> {
        let from = parse_state::<S>(from)?;
        let to = parse_state::<S>(to)?;
        validate(from, to, ctx).map(|_| ())
    }

    match kind {
        EntityKind::Person => run::<PersonStatus>(from, to, ctx),
        EntityKind::VerificationRequest => run::<VerificationRequestStatus>(from, to, ctx),
        EntityKind::Visit => run::<VisitStatus>(from, to, ctx),
        EntityKind::EmergencyAlert => run::<AlertStatus>(from, to, ctx),
        EntityKind::Registration => run::<RegistrationStatus>(from, to, ctx),
    }
}

enum GuardFailure {
    Unmet(String),
    Evidence(BwError),
}

fn check_guard(guard: Guard, ctx: &TransitionContext<'_>) -> Result<(), GuardFailure> {
    match guard {
        Guard::CompletedVerificationVisit => {
            let person_id = ctx
                .linked_person_id
                .ok_or_else(|| GuardFailure::Unmet("registration has no linked person".into()))?;
            let present = ctx
                .guards
                .has_completed_verification_visit(person_id)
                .map_err(GuardFailure::Evidence)?;
            if present {
                Ok(())
            } else {
                Err(GuardFailure::Unmet(format!(
                    "a Completed Verification visit is required for person {} before approval",
                    person_id
                )))
            }
        }
    }
}
