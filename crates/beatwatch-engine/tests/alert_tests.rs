// Emergency alerts: single active alert per person, transitions, SLA
// metrics and the breach sweep

mod common;

use beatwatch_core::model::VerificationState;
use beatwatch_core::permissions::ALERT_UPDATE_STATUS;
use beatwatch_core::sla::{BreachKind, BreachSeverity};
use beatwatch_core::workflow::AlertStatus;
use beatwatch_core::BwErrorKind;
use beatwatch_engine::alerts::{alert_sla, raise_alert, sweep_sla_breaches};
use beatwatch_engine::reads::list_alerts;
use beatwatch_engine::transition::update_alert_status;
use beatwatch_engine::EngineContext;
use beatwatch_store::repo::{Page, PersonRepo};
use chrono::Duration;
use common::{admin, ctx, setup, station_caller, t0};

fn ctx_at(offset: Duration) -> EngineContext {
    EngineContext::default().with_fixed_time(t0() + offset)
}

#[test]
fn test_second_active_alert_is_rejected() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();

    let first = raise_alert(&ctx, &admin(), "p-1", Some("Fall at home".into()), &mut conn).unwrap();
    assert_eq!(first.status, AlertStatus::Active);
    assert_eq!(first.location.station_id.as_deref(), Some("st-a"));

    let err = raise_alert(&ctx, &admin(), "p-1", None, &mut conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::DuplicateActiveAlert);
    assert_eq!(err.http_status(), 409);
    assert_eq!(err.details(), &[first.id.clone()]);

    // Other people are unaffected
    raise_alert(&ctx, &admin(), "p-2", None, &mut conn).unwrap();

    // Once the first is no longer Active a new one may be raised
    update_alert_status(&ctx, &admin(), &first.id, "Responded", None, &mut conn).unwrap();
    raise_alert(&ctx, &admin(), "p-1", None, &mut conn).unwrap();
}

#[test]
fn test_alert_transitions_stamp_times() {
    let (_dir, mut conn) = setup();
    let alert = raise_alert(&ctx(), &admin(), "p-1", None, &mut conn).unwrap();

    // Active cannot be resolved without a response
    let err = update_alert_status(&ctx(), &admin(), &alert.id, "Resolved", None, &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::InvalidTransition);
    assert_eq!(
        err.details(),
        &["Responded".to_string(), "FalseAlarm".to_string()]
    );

    let responded = update_alert_status(
        &ctx_at(Duration::minutes(5)),
        &admin(),
        &alert.id,
        "Responded",
        Some("Officer on site".into()),
        &mut conn,
    )
    .unwrap();
    assert_eq!(responded.responded_at, Some(t0() + Duration::minutes(5)));
    assert_eq!(responded.responded_by.as_deref(), Some("admin-1"));
    assert_eq!(responded.notes.as_deref(), Some("Officer on site"));

    let resolved = update_alert_status(
        &ctx_at(Duration::minutes(40)),
        &admin(),
        &alert.id,
        "Resolved",
        None,
        &mut conn,
    )
    .unwrap();
    assert_eq!(resolved.resolved_at, Some(t0() + Duration::minutes(40)));
    assert_eq!(resolved.notes.as_deref(), Some("Officer on site"));
}

#[test]
fn test_false_alarm_stamps_nothing() {
    let (_dir, mut conn) = setup();
    let alert = raise_alert(&ctx(), &admin(), "p-2", None, &mut conn).unwrap();
    let closed =
        update_alert_status(&ctx(), &admin(), &alert.id, "false_alarm", None, &mut conn).unwrap();
    assert_eq!(closed.status, AlertStatus::FalseAlarm);
    assert!(closed.responded_at.is_none());
    assert!(closed.resolved_at.is_none());
}

#[test]
fn test_sla_response_boundary_is_strict() {
    let (_dir, mut conn) = setup();

    // Responded after exactly 15 minutes
    let on_time = raise_alert(&ctx(), &admin(), "p-1", None, &mut conn).unwrap();
    update_alert_status(
        &ctx_at(Duration::minutes(15)),
        &admin(),
        &on_time.id,
        "Responded",
        None,
        &mut conn,
    )
    .unwrap();
    let metrics = alert_sla(&ctx(), &admin(), &on_time.id, &conn).unwrap();
    assert_eq!(metrics.response_time_minutes, Some(15.0));
    assert!(!metrics.response_breached);
    assert_eq!(metrics.resolution_time_minutes, None);

    // Responded after 15.01 minutes
    let late = raise_alert(&ctx(), &admin(), "p-2", None, &mut conn).unwrap();
    update_alert_status(
        &ctx_at(Duration::milliseconds(15 * 60_000 + 600)),
        &admin(),
        &late.id,
        "Responded",
        None,
        &mut conn,
    )
    .unwrap();
    let metrics = alert_sla(&ctx(), &admin(), &late.id, &conn).unwrap();
    assert!(metrics.response_breached);
}

#[test]
fn test_live_breach_and_sweep() {
    let (_dir, mut conn) = setup();
    let alert = raise_alert(&ctx(), &admin(), "p-1", None, &mut conn).unwrap();

    let later = ctx_at(Duration::minutes(20));
    let metrics = alert_sla(&later, &admin(), &alert.id, &conn).unwrap();
    assert_eq!(metrics.elapsed_minutes, Some(20.0));
    assert!(metrics.live_breached);

    let breaches = sweep_sla_breaches(&later, &conn).unwrap();
    let ours: Vec<_> = breaches.iter().filter(|b| b.entity_id == alert.id).collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].kind, BreachKind::SosResponse);
    assert_eq!(ours[0].severity, BreachSeverity::Critical);
    assert_eq!(ours[0].breach_minutes, 5);

    // p-1 and p-2 have been pending verification for 8 days by now
    let week_later = ctx_at(Duration::days(8));
    let breaches = sweep_sla_breaches(&week_later, &conn).unwrap();
    let pending: Vec<&str> = breaches
        .iter()
        .filter(|b| b.kind == BreachKind::VerificationVisit)
        .map(|b| b.entity_id.as_str())
        .collect();
    assert_eq!(pending.len(), 2);
    assert!(pending.contains(&"p-1"));
}

#[test]
fn test_sweep_flags_verified_people_overdue_for_a_visit() {
    let (_dir, conn) = setup();
    for id in ["p-1", "p-2"] {
        PersonRepo::set_verification(&conn, id, VerificationState::Verified, None, t0()).unwrap();
    }
    PersonRepo::record_visit_outcome(&conn, "p-1", None, t0() + Duration::days(5)).unwrap();
    PersonRepo::record_visit_outcome(&conn, "p-2", None, t0() + Duration::days(20)).unwrap();

    // 40 days on, p-1's last visit is 35 days old and p-2's only 20
    let breaches = sweep_sla_breaches(&ctx_at(Duration::days(40)), &conn).unwrap();
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].kind, BreachKind::RoutineVisit);
    assert_eq!(breaches[0].entity_id, "p-1");
    assert_eq!(breaches[0].expected_by, t0() + Duration::days(35));
    assert_eq!(breaches[0].breach_minutes, 5 * 24 * 60);
    assert_eq!(breaches[0].severity, BreachSeverity::Medium);
}

#[test]
fn test_custom_thresholds_apply() {
    let (_dir, mut conn) = setup();
    let mut config = beatwatch_core::EngineConfig::default();
    config.sla.response_minutes = 5.0;
    let ctx = EngineContext::new(config.clone()).with_fixed_time(t0());
    let alert = raise_alert(&ctx, &admin(), "p-1", None, &mut conn).unwrap();

    let later = EngineContext::new(config).with_fixed_time(t0() + Duration::minutes(6));
    let metrics = alert_sla(&later, &admin(), &alert.id, &conn).unwrap();
    assert!(metrics.live_breached);
}

#[test]
fn test_alert_reads_and_updates_are_scoped() {
    let (_dir, mut conn) = setup();
    let alert = raise_alert(&ctx(), &admin(), "p-1", None, &mut conn).unwrap();
    raise_alert(&ctx(), &admin(), "p-2", None, &mut conn).unwrap();

    let caller = station_caller(Some("st-b"), &[ALERT_UPDATE_STATUS]);
    let visible = list_alerts(&caller, Some(AlertStatus::Active), Page::default(), &conn).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].person_id, "p-2");

    let err = update_alert_status(&ctx(), &caller, &alert.id, "Responded", None, &mut conn)
        .unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::ScopeDenied);

    let err = alert_sla(&ctx(), &caller, &alert.id, &conn).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::ScopeDenied);
}
