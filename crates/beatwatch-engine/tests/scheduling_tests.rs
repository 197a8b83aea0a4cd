// Visit scheduling: calendar conflicts, auto-assignment, rescheduling and
// scope checks

mod common;

use beatwatch_core::assignment::CandidatePool;
use beatwatch_core::model::{HierarchyPath, NewVisit, Person, VisitType};
use beatwatch_core::permissions::VISIT_SCHEDULE;
use beatwatch_core::schedule::TimeWindow;
use beatwatch_core::workflow::VisitStatus;
use beatwatch_core::BwErrorKind;
use beatwatch_engine::assignment::assign_officer;
use beatwatch_engine::reads::{get_person, list_people, PersonQuery};
use beatwatch_engine::scheduling::{
    detect_conflict, officer_schedule, reschedule_visit, schedule_visit,
};
use beatwatch_engine::transition::cancel_visit;
use beatwatch_store::repo::{HierarchyRepo, Page, PersonRepo, VisitRepo};
use common::{admin, at, ctx, setup, station, station_caller};

fn routine(person_id: &str, officer_id: &str, h: u32, m: u32) -> NewVisit {
    NewVisit::new(person_id, VisitType::Routine, at(h, m))
        .with_officer(officer_id)
        .with_duration(30)
}

#[test]
fn test_half_open_interval_boundary() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();

    // Given an existing visit 10:15-10:45
    let existing = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 10, 15), &mut conn)
        .unwrap();

    // When checking 10:00-10:30 and 10:30-11:00
    let overlapping = detect_conflict(
        &ctx,
        "off-a",
        &TimeWindow::from_start(at(10, 0), 30),
        VisitType::Routine,
        None,
        &conn,
    )
    .unwrap();
    let touching = detect_conflict(
        &ctx,
        "off-a",
        &TimeWindow::from_start(at(10, 30), 30),
        VisitType::Routine,
        None,
        &conn,
    )
    .unwrap();

    // Then only the overlapping window conflicts
    assert_eq!(overlapping.len(), 1);
    assert_eq!(overlapping[0].id, existing.id);
    assert!(touching.is_empty());
}

#[test]
fn test_overlapping_schedule_is_rejected_with_ids() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let existing = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 10, 15), &mut conn)
        .unwrap();

    let err = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 10, 0), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::SchedulingConflict);
    assert_eq!(err.http_status(), 409);
    assert_eq!(err.details(), &[existing.id.clone()]);

    // Back-to-back is fine
    schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 10, 45), &mut conn).unwrap();
}

#[test]
fn test_emergency_visits_never_conflict() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 14, 0), &mut conn).unwrap();

    // An emergency on top of a routine visit is accepted
    let emergency = NewVisit::new("p-1", VisitType::Emergency, at(14, 10)).with_officer("off-a");
    schedule_visit(&ctx, &admin(), emergency, &mut conn).unwrap();

    // and does not block a routine visit in its own slot
    let emergency = NewVisit::new("p-1", VisitType::Emergency, at(16, 0)).with_officer("off-a");
    schedule_visit(&ctx, &admin(), emergency, &mut conn).unwrap();
    schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 16, 10), &mut conn).unwrap();
}

#[test]
fn test_cancelled_visits_free_the_slot() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let v = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 11, 0), &mut conn).unwrap();
    cancel_visit(&ctx, &admin(), &v.id, "Family request", &mut conn).unwrap();

    schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 11, 0), &mut conn).unwrap();
}

#[test]
fn test_default_duration_applies() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let spec = NewVisit::new("p-1", VisitType::FollowUp, at(9, 0)).with_officer("off-a");
    let v = schedule_visit(&ctx, &admin(), spec, &mut conn).unwrap();
    assert_eq!(v.duration_minutes, Some(30));

    let err = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 9, 29), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::SchedulingConflict);
}

#[test]
fn test_auto_assignment_uses_beat_pool() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();

    let v = schedule_visit(
        &ctx,
        &admin(),
        NewVisit::new("p-2", VisitType::Routine, at(12, 0)),
        &mut conn,
    )
    .unwrap();
    assert_eq!(v.officer_id, "off-b");
    assert_eq!(v.status, VisitStatus::Scheduled);
    assert_eq!(v.location.station_id.as_deref(), Some("st-b"));
}

#[test]
fn test_no_candidate_is_assignment_unavailable() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let empty = station("st-c", "sub-c");
    HierarchyRepo::insert_station(&conn, &empty).unwrap();
    PersonRepo::insert(
        &conn,
        &Person::new(
            "p-3",
            "Chen Wu",
            "1 Dock Road",
            HierarchyPath::from_station(&empty, None),
            common::t0(),
        ),
    )
    .unwrap();

    let err = schedule_visit(
        &ctx,
        &admin(),
        NewVisit::new("p-3", VisitType::Routine, at(12, 0)),
        &mut conn,
    )
    .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::AssignmentUnavailable);
    assert_eq!(err.entity_id(), Some("p-3"));
}

#[test]
fn test_reschedule_ignores_itself_and_checks_others() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let first = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 10, 0), &mut conn).unwrap();
    let second = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 11, 0), &mut conn).unwrap();

    // Sliding into its own old slot is fine
    let moved = reschedule_visit(&ctx, &admin(), &first.id, at(10, 15), None, &mut conn).unwrap();
    assert_eq!(moved.scheduled_at, at(10, 15));

    // Overlapping the other visit is not
    let err = reschedule_visit(&ctx, &admin(), &first.id, at(10, 45), None, &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::SchedulingConflict);
    assert_eq!(err.details(), &[second.id.clone()]);

    // Only Scheduled visits move
    cancel_visit(&ctx, &admin(), &second.id, "Duplicate booking", &mut conn).unwrap();
    let err = reschedule_visit(&ctx, &admin(), &second.id, at(15, 0), None, &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidInput);
}

#[test]
fn test_reschedule_rejects_zero_duration() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let visit = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 10, 0), &mut conn).unwrap();

    let err = reschedule_visit(&ctx, &admin(), &visit.id, at(12, 0), Some(0), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidInput);

    // The visit keeps its slot, so a second booking there still conflicts
    let stored = VisitRepo::get(&conn, &visit.id).unwrap().unwrap();
    assert_eq!(stored.scheduled_at, at(10, 0));
    assert_eq!(stored.duration_minutes, Some(30));
    let err = schedule_visit(&ctx, &admin(), routine("p-2", "off-a", 10, 0), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::SchedulingConflict);
    assert_eq!(err.details(), &[visit.id.clone()]);
}

#[test]
fn test_officer_schedule_is_ordered_and_excludes_cancelled() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let late = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 15, 0), &mut conn).unwrap();
    let early = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 9, 0), &mut conn).unwrap();
    let dropped = schedule_visit(&ctx, &admin(), routine("p-1", "off-a", 12, 0), &mut conn).unwrap();
    cancel_visit(&ctx, &admin(), &dropped.id, "Officer on leave", &mut conn).unwrap();

    let day = officer_schedule(&ctx, &admin(), "off-a", at(0, 0), at(23, 0), &conn).unwrap();
    let ids: Vec<&str> = day.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec![early.id.as_str(), late.id.as_str()]);

    let err = officer_schedule(&ctx, &admin(), "off-a", at(12, 0), at(12, 0), &conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidInput);
}

#[test]
fn test_scheduling_outside_scope_is_denied() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let caller = station_caller(Some("st-b"), &[VISIT_SCHEDULE]);

    let err = schedule_visit(&ctx, &caller, routine("p-1", "off-a", 10, 0), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::ScopeDenied);
    assert_eq!(err.http_status(), 403);

    schedule_visit(&ctx, &caller, routine("p-2", "off-b", 10, 0), &mut conn).unwrap();
}

#[test]
fn test_scheduling_requires_permission() {
    let (_dir, mut conn) = setup();
    let caller = station_caller(Some("st-a"), &[]);
    let err = schedule_visit(&ctx(), &caller, routine("p-1", "off-a", 10, 0), &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::Forbidden);
}

#[test]
fn test_unlinked_station_caller_sees_nothing() {
    let (_dir, conn) = setup();

    // Given a station-level caller whose station id is missing
    let caller = station_caller(None, &[]);

    // Then lists are empty rather than unrestricted
    let people = list_people(&caller, &PersonQuery::default(), Page::default(), &conn).unwrap();
    assert!(people.is_empty());

    // and direct access is denied
    let err = get_person(&caller, "p-1", &conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::ScopeDenied);

    let scoped = station_caller(Some("st-a"), &[]);
    let people = list_people(&scoped, &PersonQuery::default(), Page::default(), &conn).unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].id, "p-1");
}

#[test]
fn test_workload_balance_with_stable_tie_break() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    let a = station("st-a", "sub-a");
    beatwatch_store::repo::OfficerRepo::insert(&conn, &common::officer("off-0", &a, Some("beat-a1")))
        .unwrap();
    let location = PersonRepo::get(&conn, "p-1").unwrap().unwrap().location;

    // Equal load: smallest id wins, every time
    for _ in 0..3 {
        let pick = assign_officer(&location, &conn).unwrap().unwrap();
        assert_eq!(pick.officer_id, "off-0");
        assert_eq!(pick.pool, CandidatePool::Beat);
    }

    // One open visit tips the balance
    schedule_visit(&ctx, &admin(), routine("p-1", "off-0", 9, 0), &mut conn).unwrap();
    let pick = assign_officer(&location, &conn).unwrap().unwrap();
    assert_eq!(pick.officer_id, "off-a");
}
