// Status transitions through the engine: table enforcement, side effects
// on related records and operation-boundary logging

mod common;

use beatwatch_core::logging_facility::init_test_capture;
use beatwatch_core::model::{NewVisit, VisitType, VulnerabilityLevel};
use beatwatch_core::permissions::PERSON_UPDATE_STATUS;
use beatwatch_core::workflow::{PersonStatus, Transition, VisitStatus};
use beatwatch_core::BwErrorKind;
use beatwatch_engine::intake::{create_person, NewPerson};
use beatwatch_engine::scheduling::schedule_visit;
use beatwatch_engine::transition::{
    cancel_visit, complete_visit, start_visit, update_person_status, update_verification_status,
    update_visit_status, VisitOutcome,
};
use beatwatch_store::repo::{PersonRepo, VerificationRepo, VisitRepo};
use common::{admin, at, ctx, setup, station_caller, t0};
use tracing::Level;

fn book(conn: &mut rusqlite::Connection, h: u32) -> String {
    schedule_visit(
        &ctx(),
        &admin(),
        NewVisit::new("p-1", VisitType::Routine, at(h, 0)).with_officer("off-a"),
        conn,
    )
    .unwrap()
    .id
}

#[test]
fn test_person_lifecycle_follows_table() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();

    // Pending cannot jump to Deceased; the error names the legal targets
    let err = update_person_status(&ctx, &admin(), "p-1", "Deceased", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);
    assert_eq!(err.details(), &["Verified".to_string(), "Rejected".to_string()]);

    // Same state is accepted without a write
    let t = update_person_status(&ctx, &admin(), "p-1", "pending", &mut conn).unwrap();
    assert_eq!(t, Transition::NoOp(PersonStatus::Pending));

    // APPROVED is an alias of Verified
    let t = update_person_status(&ctx, &admin(), "p-1", "APPROVED", &mut conn).unwrap();
    assert_eq!(
        t,
        Transition::Apply {
            from: PersonStatus::Pending,
            to: PersonStatus::Verified
        }
    );

    let err = update_person_status(&ctx, &admin(), "p-1", "Flying", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::UnknownState);
}

#[test]
fn test_deactivating_person_cancels_open_visits() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let visit_id = book(&mut conn, 15);
    update_person_status(&ctx, &admin(), "p-1", "Verified", &mut conn).unwrap();

    update_person_status(&ctx, &admin(), "p-1", "Inactive", &mut conn).unwrap();

    let person = PersonRepo::get(&conn, "p-1").unwrap().unwrap();
    assert_eq!(person.status, PersonStatus::Inactive);
    assert!(!person.is_active);
    let visit = VisitRepo::get(&conn, &visit_id).unwrap().unwrap();
    assert_eq!(visit.status, VisitStatus::Cancelled);
    assert_eq!(visit.cancelled_by.as_deref(), Some("admin-1"));

    // Inactive people cannot be booked
    let err = schedule_visit(
        &ctx,
        &admin(),
        NewVisit::new("p-1", VisitType::Routine, at(17, 0)).with_officer("off-a"),
        &mut conn,
    )
    .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidInput);
}

#[test]
fn test_visit_must_start_before_completing() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let visit_id = book(&mut conn, 11);

    let err = complete_visit(&ctx, &admin(), &visit_id, VisitOutcome::default(), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);

    let started = start_visit(&ctx, &admin(), &visit_id, &mut conn).unwrap();
    assert_eq!(started.status, VisitStatus::InProgress);
    assert_eq!(started.started_at, Some(t0()));

    let done = complete_visit(
        &ctx,
        &admin(),
        &visit_id,
        VisitOutcome {
            risk_score: Some(80),
            notes: Some("Needs daily check".into()),
        },
        &mut conn,
    )
    .unwrap();
    assert_eq!(done.visit.status, VisitStatus::Completed);
    assert_eq!(done.visit.risk_score, Some(80));
    assert!(done.approval.is_none());

    let person = PersonRepo::get(&conn, "p-1").unwrap().unwrap();
    assert_eq!(person.vulnerability, VulnerabilityLevel::Critical);
    assert_eq!(person.last_visit_at, Some(t0()));

    // Terminal
    let err = cancel_visit(&ctx, &admin(), &visit_id, "Too late", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);
    assert!(err.details().is_empty());
}

#[test]
fn test_visit_outcome_validation() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let visit_id = book(&mut conn, 12);
    start_visit(&ctx, &admin(), &visit_id, &mut conn).unwrap();

    let err = complete_visit(
        &ctx,
        &admin(),
        &visit_id,
        VisitOutcome {
            risk_score: Some(101),
            notes: None,
        },
        &mut conn,
    )
    .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidInput);

    let err = cancel_visit(&ctx, &admin(), &visit_id, "  ", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidInput);

    // In progress visits may still be cancelled
    let visit = cancel_visit(&ctx, &admin(), &visit_id, "Person not home", &mut conn).unwrap();
    assert_eq!(visit.status, VisitStatus::Cancelled);
    assert_eq!(visit.cancel_reason.as_deref(), Some("Person not home"));
}

#[test]
fn test_status_string_dispatch_for_visits() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let visit_id = book(&mut conn, 13);

    let visit = update_visit_status(&ctx, &admin(), &visit_id, "IN_PROGRESS", &mut conn).unwrap();
    assert_eq!(visit.status, VisitStatus::InProgress);

    let err = update_visit_status(&ctx, &admin(), &visit_id, "Scheduled", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);

    let visit = update_visit_status(&ctx, &admin(), &visit_id, "completed", &mut conn).unwrap();
    assert_eq!(visit.status, VisitStatus::Completed);
}

#[test]
fn test_verification_request_pipeline() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let person = create_person(
        &ctx,
        &admin(),
        &NewPerson {
            full_name: "Esi Mensah".into(),
            contact: None,
            address: "3 Quay Street".into(),
            station_id: "st-a".into(),
            beat_id: None,
        },
        &mut conn,
    )
    .unwrap();
    let request = VerificationRepo::latest_open_for_person(&conn, &person.id)
        .unwrap()
        .unwrap();

    // Pending cannot be approved directly
    let err = update_verification_status(&ctx, &admin(), &request.id, "Approved", None, None, &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);
    assert_eq!(err.details(), &["InProgress".to_string()]);

    update_verification_status(&ctx, &admin(), &request.id, "InProgress", None, None, &mut conn)
        .unwrap();
    let outcome = update_verification_status(
        &ctx,
        &admin(),
        &request.id,
        "Rejected",
        None,
        Some("Address could not be confirmed".into()),
        &mut conn,
    )
    .unwrap();
    assert!(outcome.approval.is_none());

    let stored = PersonRepo::get(&conn, &person.id).unwrap().unwrap();
    assert_eq!(
        stored.verification_status,
        beatwatch_core::model::VerificationState::Rejected
    );
    assert_eq!(stored.remarks.as_deref(), Some("Address could not be confirmed"));
}

#[test]
fn test_status_change_outside_scope_is_denied() {
    let (_dir, mut conn) = setup();
    let caller = station_caller(Some("st-b"), &[PERSON_UPDATE_STATUS]);
    let err = update_person_status(&ctx(), &caller, "p-1", "Verified", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::ScopeDenied);
    assert_eq!(err.entity_id(), Some("p-1"));

    let err = update_person_status(&ctx(), &caller, "p-missing", "Verified", &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::NotFound);
}

#[test]
fn test_operations_log_start_and_end() {
    let capture = init_test_capture();
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let visit_id = book(&mut conn, 16);

    start_visit(&ctx, &admin(), &visit_id, &mut conn).unwrap();
    let err = start_visit(&ctx, &admin(), "v-does-not-exist", &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::NotFound);

    let ours = capture.events_for("start_visit", Some(("visit_id", visit_id.as_str())));
    assert!(ours.iter().any(|e| e.event.as_deref() == Some("start")));
    capture.assert_event_exists("start_visit", "end");

    let failed = capture.events_for("start_visit", Some(("visit_id", "v-does-not-exist")));
    let end_error = failed
        .iter()
        .find(|e| e.event.as_deref() == Some("end_error"))
        .expect("failure should be logged");
    assert_eq!(end_error.level, Level::WARN);
    assert_eq!(end_error.field("err_code"), Some("ERR_NOT_FOUND"));
}
