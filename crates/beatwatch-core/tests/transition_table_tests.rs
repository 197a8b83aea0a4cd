#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use beatwatch_core::errors::{BwError, BwErrorKind};
use beatwatch_core::workflow::{
    transition_table, validate, validate_transition, AlertStatus, EntityKind, GuardContext,
    NoEvidence, PersonStatus, RegistrationStatus, TransitionContext, VerificationRequestStatus,
    VisitStatus, WorkflowState,
};
use proptest::prelude::*;

struct AlwaysVerified;

impl GuardContext for AlwaysVerified {
    fn has_completed_verification_visit(&self, _person_id: &str) -> Result<bool, BwError> {
        Ok(true)
    }
}

fn edges<S: WorkflowState>() -> HashSet<(S, S)> {
    transition_table::<S>()
        .into_iter()
        .flat_map(|(from, nexts)| nexts.iter().map(move |to| (from, *to)))
        .collect()
}

/// Every ordered pair of states is accepted exactly when it is an edge
/// (guards satisfied) or a same-state no-op.
fn check_kind<S: WorkflowState>() {
    let table = edges::<S>();
    let guards = AlwaysVerified;
    let ctx = TransitionContext::new(&guards).with_linked_person(Some("p-1"));

    for from in S::all() {
        for to in S::all() {
            let result = validate(*from, *to, &ctx);
            if from == to || table.contains(&(*from, *to)) {
                assert!(result.is_ok(), "{:?} -> {:?} should pass", from, to);
            } else {
                let err = result.unwrap_err();
                assert_eq!(err.kind(), BwErrorKind::InvalidTransition, "{:?} -> {:?}", from, to);
                let allowed: Vec<String> =
                    from.next_states().iter().map(|s| s.as_str().to_string()).collect();
                assert_eq!(err.details(), allowed.as_slice());
            }
        }
    }
}

#[test]
fn test_every_pair_for_every_kind() {
    check_kind::<PersonStatus>();
    check_kind::<VerificationRequestStatus>();
    check_kind::<VisitStatus>();
    check_kind::<AlertStatus>();
    check_kind::<RegistrationStatus>();
}

#[test]
fn test_tables_reproduced_exactly() {
    use RegistrationStatus as R;
    assert_eq!(
        edges::<RegistrationStatus>(),
        HashSet::from([
            (R::InProgress, R::PendingReview),
            (R::PendingReview, R::Approved),
            (R::PendingReview, R::Rejected),
            (R::Rejected, R::PendingReview),
            (R::Rejected, R::InProgress),
        ])
    );

    use AlertStatus as A;
    assert_eq!(
        edges::<AlertStatus>(),
        HashSet::from([
            (A::Active, A::Responded),
            (A::Active, A::FalseAlarm),
            (A::Responded, A::Resolved),
        ])
    );

    use VisitStatus as V;
    assert_eq!(
        edges::<VisitStatus>(),
        HashSet::from([
            (V::Scheduled, V::InProgress),
            (V::Scheduled, V::Cancelled),
            (V::InProgress, V::Completed),
            (V::InProgress, V::Cancelled),
        ])
    );

    use PersonStatus as P;
    assert_eq!(
        edges::<PersonStatus>(),
        HashSet::from([
            (P::Pending, P::Verified),
            (P::Pending, P::Rejected),
            (P::Verified, P::Inactive),
            (P::Verified, P::Deceased),
        ])
    );

    use VerificationRequestStatus as Q;
    assert_eq!(
        edges::<VerificationRequestStatus>(),
        HashSet::from([
            (Q::Pending, Q::InProgress),
            (Q::InProgress, Q::Approved),
            (Q::InProgress, Q::Rejected),
        ])
    );
}

#[test]
fn test_guard_distinct_from_invalid_transition() {
    let ctx = TransitionContext::new(&NoEvidence).with_linked_person(Some("p-9"));
    let err = validate_transition(EntityKind::Registration, "PendingReview", "Approved", &ctx)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::GuardUnmet);

    let err = validate_transition(EntityKind::Registration, "InProgress", "Approved", &ctx)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);
    assert_eq!(err.details(), &["PendingReview".to_string()]);
}

#[test]
fn test_guard_accepts_once_visit_exists() {
    let ctx = TransitionContext::new(&AlwaysVerified).with_linked_person(Some("p-9"));
    validate_transition(EntityKind::Registration, "PENDING_REVIEW", "APPROVED", &ctx).unwrap();
}

fn spelling(s: &str, style: u8) -> String {
    match style % 3 {
        0 => s.to_string(),
        1 => s.to_uppercase(),
        _ => {
            let mut out = String::new();
            for (i, c) in s.chars().enumerate() {
                if i > 0 && c.is_uppercase() {
                    out.push('_');
                }
                out.push(c.to_ascii_uppercase());
            }
            out
        }
    }
}

proptest! {
    #[test]
    fn prop_visit_string_api_matches_table(
        from in 0usize..4,
        to in 0usize..4,
        style_a in 0u8..3,
        style_b in 0u8..3,
    ) {
        let from_s = VisitStatus::all()[from];
        let to_s = VisitStatus::all()[to];
        let ctx = TransitionContext::new(&NoEvidence);
        let result = validate_transition(
            EntityKind::Visit,
            &spelling(from_s.as_str(), style_a),
            &spelling(to_s.as_str(), style_b),
            &ctx,
        );
        let legal = from_s == to_s || from_s.can_transition_to(to_s);
        prop_assert_eq!(result.is_ok(), legal);
    }
}
