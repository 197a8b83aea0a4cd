//! Emergency alerts and SLA monitoring

#![allow(clippy::result_large_err)]

use beatwatch_core::errors::{BeatwatchError, BwErrorKind};
use beatwatch_core::model::{new_id, EmergencyAlert, Person};
use beatwatch_core::notify::NotificationTopic;
use beatwatch_core::permissions::ALERT_RAISE;
use beatwatch_core::sla::{compute_sla, scan_breaches, BreachSeverity, SlaBreach, SlaMetrics};
use beatwatch_core::workflow::AlertStatus;
use beatwatch_core::{log_op_end, log_op_error, log_op_start, Caller};
use beatwatch_store::errors::from_rusqlite;
use beatwatch_store::repo::{AlertRepo, OfficerRepo, PersonRepo};
use beatwatch_store::Result;
use chrono::Duration;
use rusqlite::{Connection, TransactionBehavior};

use crate::context::EngineContext;
use crate::notifications;
use crate::reads::load_alert_in_scope;

/// Raise an SOS for a person
///
/// The duplicate check and the insert run in one `BEGIN IMMEDIATE`
/// transaction, and the partial unique index on Active alerts backs it up:
/// a racing second insert surfaces as `DuplicateActiveAlert` as well.
///
/// # Errors
///
/// `Forbidden` without `alert:raise`; `NotFound` for the person;
/// `DuplicateActiveAlert` when one is already Active.
pub fn raise_alert(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    notes: Option<String>,
    conn: &mut Connection,
) -> Result<EmergencyAlert> {
    log_op_start!("raise_alert", person_id = person_id);
    let start = std::time::Instant::now();

    let result = raise_alert_impl(ctx, caller, person_id, notes, conn).map_err(|e| {
        log_op_error!(
            "raise_alert",
            &e,
            duration_ms = start.elapsed().as_millis() as u64,
            person_id = person_id
        );
        e
    })?;

    log_op_end!(
        "raise_alert",
        duration_ms = start.elapsed().as_millis() as u64,
        alert_id = result.id.as_str()
    );
    Ok(result)
}

fn raise_alert_impl(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    notes: Option<String>,
    conn: &mut Connection,
) -> Result<EmergencyAlert> {
    caller.require(ALERT_RAISE)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let person = PersonRepo::get(&tx, person_id)?.ok_or_else(|| BeatwatchError::PersonNotFound {
        person_id: person_id.to_string(),
    })?;
    if let Some(existing) = AlertRepo::active_for_person(&tx, &person.id)? {
        return Err(BeatwatchError::DuplicateActiveAlert {
            person_id: person.id,
            alert_id: existing.id,
        }
        .into());
    }

    let alert = EmergencyAlert {
        id: new_id(),
        person_id: person.id.clone(),
        location: person.location.clone(),
        status: AlertStatus::Active,
        notes,
        responded_by: None,
        created_at: ctx.now(),
        responded_at: None,
        resolved_at: None,
    };
    AlertRepo::insert(&tx, &alert).map_err(|e| {
        if e.kind() == BwErrorKind::ConstraintViolation {
            BeatwatchError::DuplicateActiveAlert {
                person_id: alert.person_id.clone(),
                alert_id: String::new(),
            }
            .into()
        } else {
            e
        }
    })?;

    let officer_contact = match person.assigned_officer_id.as_deref() {
        Some(officer_id) => OfficerRepo::get(&tx, officer_id)?.and_then(|o| o.contact),
        None => None,
    };
    tx.commit().map_err(from_rusqlite)?;

    notifications::enqueue(
        conn,
        officer_contact.as_deref(),
        NotificationTopic::AlertRaised,
        format!("Emergency alert raised for {} at {}", person.full_name, person.address),
        ctx.now(),
    );
    Ok(alert)
}

/// Response, resolution and live elapsed minutes for one alert
///
/// # Errors
///
/// `NotFound` / `ScopeDenied` for the alert.
pub fn alert_sla(
    ctx: &EngineContext,
    caller: &Caller,
    alert_id: &str,
    conn: &Connection,
) -> Result<SlaMetrics> {
    let alert = load_alert_in_scope(caller, alert_id, conn)?;
    Ok(compute_sla(&alert, &ctx.sla_policy(), ctx.now()))
}

fn sweep_inputs(
    ctx: &EngineContext,
    conn: &Connection,
) -> Result<(Vec<EmergencyAlert>, Vec<Person>)> {
    let alerts = AlertRepo::list_open(conn)?;
    let routine_cutoff = ctx.now() - Duration::days(i64::from(ctx.config.sla.routine_visit_days));
    let mut people = PersonRepo::pending_verification(conn)?;
    people.extend(PersonRepo::verified_not_visited_since(conn, routine_cutoff)?);
    Ok((alerts, people))
}

/// Every open breach as of now: late responses and resolutions, people
/// left unverified past the verification window, and verified people
/// overdue for a routine visit
///
/// Breaches are logged (Critical at `error`, the rest at `warn`) and
/// returned; nothing is written.
pub fn sweep_sla_breaches(ctx: &EngineContext, conn: &Connection) -> Result<Vec<SlaBreach>> {
    log_op_start!("sweep_sla_breaches");
    let start = std::time::Instant::now();

    let result = sweep_inputs(ctx, conn)
        .map(|(alerts, people)| scan_breaches(&alerts, &people, &ctx.sla_policy(), ctx.now()))
        .map_err(|e| {
            log_op_error!(
                "sweep_sla_breaches",
                &e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    for breach in &result {
        if breach.severity == BreachSeverity::Critical {
            tracing::error!(
                breach_kind = breach.kind.as_str(),
                entity_id = breach.entity_id.as_str(),
                breach_minutes = breach.breach_minutes,
                "SLA breach"
            );
        } else {
            tracing::warn!(
                breach_kind = breach.kind.as_str(),
                entity_id = breach.entity_id.as_str(),
                breach_minutes = breach.breach_minutes,
                severity = ?breach.severity,
                "SLA breach"
            );
        }
    }

    log_op_end!(
        "sweep_sla_breaches",
        duration_ms = start.elapsed().as_millis() as u64,
        breaches = result.len()
    );
    Ok(result)
}
