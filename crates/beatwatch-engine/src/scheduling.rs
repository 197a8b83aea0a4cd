//! Visit scheduling with officer-calendar conflict detection
//!
//! The conflict read and the insert share one `BEGIN IMMEDIATE`
//! transaction, so two writers cannot both see a free slot and book it.

#![allow(clippy::result_large_err)]

use beatwatch_core::errors::BeatwatchError;
use beatwatch_core::model::{new_id, NewVisit, Person, Visit, VisitType};
use beatwatch_core::notify::NotificationTopic;
use beatwatch_core::permissions::VISIT_SCHEDULE;
use beatwatch_core::schedule::{find_conflicts, TimeWindow};
use beatwatch_core::workflow::{VisitStatus, WorkflowState};
use beatwatch_core::{log_op_end, log_op_error, log_op_start, Caller};
use beatwatch_store::errors::from_rusqlite;
use beatwatch_store::repo::{OfficerRepo, VisitRepo};
use beatwatch_store::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::assignment::assign_officer;
use crate::context::EngineContext;
use crate::notifications;
use crate::reads::{load_officer_in_scope, load_person_in_scope, load_visit_in_scope};

/// Visits on `officer_id`'s calendar that collide with `window`
///
/// Emergency candidates never conflict; existing Emergency and Cancelled
/// visits never block. `exclude_id` skips the visit being moved.
pub fn detect_conflict(
    ctx: &EngineContext,
    officer_id: &str,
    window: &TimeWindow,
    visit_type: VisitType,
    exclude_id: Option<&str>,
    conn: &Connection,
) -> Result<Vec<Visit>> {
    if visit_type.is_conflict_exempt() {
        return Ok(Vec::new());
    }
    let calendar = VisitRepo::officer_calendar(
        conn,
        officer_id,
        window.start,
        window.end,
        ctx.default_duration(),
    )?;
    Ok(find_conflicts(window, visit_type, &calendar, exclude_id)
        .into_iter()
        .cloned()
        .collect())
}

/// Book a visit, picking the least-loaded officer when none is named
///
/// # Errors
///
/// - `Forbidden` without `visit:schedule`
/// - `NotFound` / `ScopeDenied` for the person
/// - `AssignmentUnavailable` when no officer is named and none can be found
/// - `SchedulingConflict` listing the overlapping visit ids
pub fn schedule_visit(
    ctx: &EngineContext,
    caller: &Caller,
    new_visit: NewVisit,
    conn: &mut Connection,
) -> Result<Visit> {
    log_op_start!(
        "schedule_visit",
        person_id = new_visit.person_id.as_str(),
        visit_type = new_visit.visit_type.as_str()
    );
    let start = std::time::Instant::now();

    let result = schedule_visit_impl(ctx, caller, &new_visit, conn).map_err(|e| {
        log_op_error!(
            "schedule_visit",
            &e,
            duration_ms = start.elapsed().as_millis() as u64,
            person_id = new_visit.person_id.as_str()
        );
        e
    })?;

    log_op_end!(
        "schedule_visit",
        duration_ms = start.elapsed().as_millis() as u64,
        visit_id = result.id.as_str(),
        officer_id = result.officer_id.as_str()
    );
    Ok(result)
}

fn schedule_visit_impl(
    ctx: &EngineContext,
    caller: &Caller,
    new_visit: &NewVisit,
    conn: &mut Connection,
) -> Result<Visit> {
    caller.require(VISIT_SCHEDULE)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let person = load_person_in_scope(caller, &new_visit.person_id, &tx)?;
    if !person.is_active {
        return Err(BeatwatchError::InvalidInput {
            reason: format!("person {} is not active", person.id),
        }
        .into());
    }

    let officer_id = match &new_visit.officer_id {
        Some(id) => id.clone(),
        None => assign_officer(&person.location, &tx)?
            .map(|a| a.officer_id)
            .ok_or_else(|| BeatwatchError::AssignmentUnavailable {
                person_id: person.id.clone(),
            })?,
    };

    let visit = insert_checked(ctx, &tx, &person, &officer_id, new_visit)?;
    tx.commit().map_err(from_rusqlite)?;

    notifications::enqueue(
        conn,
        person.contact.as_deref(),
        NotificationTopic::VisitScheduled,
        format!(
            "A {} visit is scheduled for {}",
            visit.visit_type.as_str(),
            visit.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        ctx.now(),
    );
    Ok(visit)
}

/// Conflict-check and insert inside the caller's transaction
pub(crate) fn insert_checked(
    ctx: &EngineContext,
    conn: &Connection,
    person: &Person,
    officer_id: &str,
    spec: &NewVisit,
) -> Result<Visit> {
    let officer = OfficerRepo::get(conn, officer_id)?.ok_or_else(|| {
        BeatwatchError::OfficerNotFound {
            officer_id: officer_id.to_string(),
        }
    })?;
    if !officer.is_active {
        return Err(BeatwatchError::InvalidInput {
            reason: format!("officer {} is not active", officer.id),
        }
        .into());
    }

    let minutes = spec.duration_minutes.unwrap_or(ctx.default_duration());
    if minutes == 0 {
        return Err(BeatwatchError::InvalidInput {
            reason: "visit duration must be positive".to_string(),
        }
        .into());
    }

    let window = TimeWindow::from_start(spec.scheduled_at, minutes);
    let conflicts = detect_conflict(ctx, &officer.id, &window, spec.visit_type, None, conn)?;
    if !conflicts.is_empty() {
        return Err(BeatwatchError::SchedulingConflict {
            officer_id: officer.id,
            visit_ids: conflicts.into_iter().map(|v| v.id).collect(),
        }
        .into());
    }

    let now = ctx.now();
    let visit = Visit {
        id: new_id(),
        person_id: person.id.clone(),
        officer_id: officer.id,
        location: person.location.clone(),
        visit_type: spec.visit_type,
        priority: spec.priority,
        status: VisitStatus::Scheduled,
        scheduled_at: spec.scheduled_at,
        duration_minutes: Some(minutes),
        notes: spec.notes.clone(),
        previous_address: spec.previous_address.clone(),
        risk_score: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancel_reason: None,
        created_at: now,
        updated_at: now,
    };
    VisitRepo::insert(conn, &visit)?;
    Ok(visit)
}

/// Move a Scheduled visit, re-checking the officer's calendar without it
///
/// # Errors
///
/// `InvalidInput` unless the visit is Scheduled or for a zero duration;
/// `SchedulingConflict` when the new slot collides with another visit.
pub fn reschedule_visit(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    scheduled_at: DateTime<Utc>,
    duration_minutes: Option<u32>,
    conn: &mut Connection,
) -> Result<Visit> {
    log_op_start!("reschedule_visit", visit_id = visit_id);
    let start = std::time::Instant::now();

    let result = reschedule_visit_impl(ctx, caller, visit_id, scheduled_at, duration_minutes, conn)
        .map_err(|e| {
            log_op_error!(
                "reschedule_visit",
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                visit_id = visit_id
            );
            e
        })?;

    log_op_end!(
        "reschedule_visit",
        duration_ms = start.elapsed().as_millis() as u64,
        visit_id = visit_id
    );
    Ok(result)
}

fn reschedule_visit_impl(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    scheduled_at: DateTime<Utc>,
    duration_minutes: Option<u32>,
    conn: &mut Connection,
) -> Result<Visit> {
    caller.require(VISIT_SCHEDULE)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let visit = load_visit_in_scope(caller, visit_id, &tx)?;
    if visit.status != VisitStatus::Scheduled {
        return Err(BeatwatchError::InvalidInput {
            reason: format!(
                "only Scheduled visits can be rescheduled; visit {} is {}",
                visit.id,
                visit.status.as_str()
            ),
        }
        .into());
    }

    let minutes = duration_minutes
        .or(visit.duration_minutes)
        .unwrap_or(ctx.default_duration());
    if minutes == 0 {
        return Err(BeatwatchError::InvalidInput {
            reason: "visit duration must be positive".to_string(),
        }
        .into());
    }
    let window = TimeWindow::from_start(scheduled_at, minutes);
    let conflicts = detect_conflict(
        ctx,
        &visit.officer_id,
        &window,
        visit.visit_type,
        Some(&visit.id),
        &tx,
    )?;
    if !conflicts.is_empty() {
        return Err(BeatwatchError::SchedulingConflict {
            officer_id: visit.officer_id,
            visit_ids: conflicts.into_iter().map(|v| v.id).collect(),
        }
        .into());
    }

    VisitRepo::reschedule(&tx, &visit.id, scheduled_at, Some(minutes), ctx.now())?;
    let updated = VisitRepo::get(&tx, &visit.id)?.ok_or_else(|| BeatwatchError::VisitNotFound {
        visit_id: visit.id.clone(),
    })?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(updated)
}

/// Non-cancelled visits of an officer in `[from, to)`, soonest first
///
/// # Errors
///
/// `InvalidInput` for an empty range; `NotFound` / `ScopeDenied` for the
/// officer.
pub fn officer_schedule(
    ctx: &EngineContext,
    caller: &Caller,
    officer_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<Visit>> {
    if to <= from {
        return Err(BeatwatchError::InvalidInput {
            reason: "schedule range end must be after its start".to_string(),
        }
        .into());
    }
    let officer = load_officer_in_scope(caller, officer_id, conn)?;
    VisitRepo::officer_calendar(conn, &officer.id, from, to, ctx.default_duration())
}
