//! Follow-up work triggered by a change of location or verification
//!
//! The address-change cascade is best-effort: every step runs in its own
//! transaction, a failing step is logged and recorded in the summary, and
//! the remaining steps still run. Re-running the cascade is safe; visits
//! already cancelled are not touched again.
//!
//! Verification approval, by contrast, is one multi-record transition and
//! always runs inside the caller's transaction.

#![allow(clippy::result_large_err)]

use beatwatch_core::credential::credential_number;
use beatwatch_core::errors::{BeatwatchError, BwError, BwErrorKind};
use beatwatch_core::model::{
    new_id, HierarchyPath, NewVisit, Person, VerificationMethod, VerificationRequest,
    VerificationState, VisitPriority, VisitType,
};
use beatwatch_core::notify::NotificationTopic;
use beatwatch_core::permissions::PERSON_RELOCATE;
use beatwatch_core::schedule::first_free_window;
use beatwatch_core::workflow::{
    validate, NoEvidence, PersonStatus, RegistrationStatus, TransitionContext,
    VerificationRequestStatus, VisitStatus,
};
use beatwatch_core::{log_op_end, log_op_error, log_op_start, Caller};
use beatwatch_core_types::correlation::SYSTEM_ACTOR;
use beatwatch_store::errors::from_rusqlite;
use beatwatch_store::repo::{PersonRepo, RegistrationRepo, VerificationRepo, VisitRepo};
use beatwatch_store::{Result, SqliteGuards};
use chrono::{Datelike, Duration};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::assignment::assign_officer;
use crate::context::EngineContext;
use crate::intake::resolve_location;
use crate::notifications;
use crate::reads::load_person_in_scope;
use crate::scheduling::insert_checked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeStep {
    CancelVisits,
    ReassignOfficer,
    ScheduleReverification,
    ResetVerification,
}

impl CascadeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStep::CancelVisits => "cancel_visits",
            CascadeStep::ReassignOfficer => "reassign_officer",
            CascadeStep::ScheduleReverification => "schedule_reverification",
            CascadeStep::ResetVerification => "reset_verification",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeStepFailure {
    pub step: CascadeStep,
    pub code: String,
    pub message: String,
}

/// What the address-change cascade did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub person_id: String,
    pub cancelled_visit_ids: Vec<String>,
    pub previous_officer_id: Option<String>,
    /// `None` when no officer could be found for the new location
    pub new_officer_id: Option<String>,
    pub reverification_visit_id: Option<String>,
    pub verification_reset: bool,
    pub failures: Vec<CascadeStepFailure>,
}

impl CascadeSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: CascadeStep, err: &BwError) {
        tracing::warn!(
            person_id = self.person_id.as_str(),
            step = step.as_str(),
            err_code = err.code(),
            error = %err,
            "cascade step failed"
        );
        self.failures.push(CascadeStepFailure {
            step,
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }
}

/// New place of residence for [`relocate_person`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub station_id: String,
    /// Must belong to `station_id` when given
    pub beat_id: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct RelocationOutcome {
    pub person: Person,
    /// `None` when only the address text changed, which does not cascade
    pub cascade: Option<CascadeSummary>,
}

/// Move a person and cascade when the beat, station, sub-area or district
/// changed
///
/// The hierarchy ids are re-derived from the station node, so the stored
/// path always agrees with the tree.
///
/// # Errors
///
/// - `Forbidden` without `person:relocate`
/// - `NotFound` / `ScopeDenied` for the person; `NotFound` for the station
/// - `InvalidInput` for a blank address or a beat outside the station
///
/// Cascade step failures are reported in the summary, not as errors.
pub fn relocate_person(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    relocation: &Relocation,
    conn: &mut Connection,
) -> Result<RelocationOutcome> {
    log_op_start!(
        "relocate_person",
        person_id = person_id,
        station_id = relocation.station_id.as_str()
    );
    let start = std::time::Instant::now();

    let result = relocate_person_impl(ctx, caller, person_id, relocation, conn).map_err(|e| {
        log_op_error!(
            "relocate_person",
            &e,
            duration_ms = start.elapsed().as_millis() as u64,
            person_id = person_id
        );
        e
    })?;

    log_op_end!(
        "relocate_person",
        duration_ms = start.elapsed().as_millis() as u64,
        cascaded = result.cascade.is_some()
    );
    Ok(result)
}

fn relocate_person_impl(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    relocation: &Relocation,
    conn: &mut Connection,
) -> Result<RelocationOutcome> {
    caller.require(PERSON_RELOCATE)?;

    let address = relocation.address.trim();
    if address.is_empty() {
        return Err(BeatwatchError::InvalidInput {
            reason: "address must not be empty".to_string(),
        }
        .into());
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let person = load_person_in_scope(caller, person_id, &tx)?;

    let path = resolve_location(&tx, &relocation.station_id, relocation.beat_id.as_deref())?;
    PersonRepo::relocate(&tx, &person.id, &path, address, ctx.now())?;
    tx.commit().map_err(from_rusqlite)?;

    let cascade = if person.location.location_changed(&path) {
        Some(run_address_change_cascade(
            ctx,
            &person.id,
            &person.location,
            Some(&person.address),
            conn,
        )?)
    } else {
        None
    };

    let person = PersonRepo::get(conn, &person.id)?.ok_or_else(|| {
        BeatwatchError::PersonNotFound {
            person_id: person_id.to_string(),
        }
    })?;
    Ok(RelocationOutcome { person, cascade })
}

/// Cancel stale visits, reassign, book a re-verification, reset verification
///
/// `old_location` and `previous_address` describe where the person lived
/// before; the person row must already hold the new location.
///
/// # Errors
///
/// Only `NotFound` for an unknown person. Step failures land in
/// [`CascadeSummary::failures`].
pub fn run_address_change_cascade(
    ctx: &EngineContext,
    person_id: &str,
    old_location: &HierarchyPath,
    previous_address: Option<&str>,
    conn: &mut Connection,
) -> Result<CascadeSummary> {
    log_op_start!("address_change_cascade", person_id = person_id);
    let start = std::time::Instant::now();

    let result = run_cascade_impl(ctx, person_id, old_location, previous_address, conn).map_err(
        |e| {
            log_op_error!(
                "address_change_cascade",
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                person_id = person_id
            );
            e
        },
    )?;

    log_op_end!(
        "address_change_cascade",
        duration_ms = start.elapsed().as_millis() as u64,
        cancelled = result.cancelled_visit_ids.len(),
        failures = result.failures.len()
    );
    Ok(result)
}

fn run_cascade_impl(
    ctx: &EngineContext,
    person_id: &str,
    old_location: &HierarchyPath,
    previous_address: Option<&str>,
    conn: &mut Connection,
) -> Result<CascadeSummary> {
    let person = PersonRepo::get(conn, person_id)?.ok_or_else(|| {
        BeatwatchError::PersonNotFound {
            person_id: person_id.to_string(),
        }
    })?;

    let mut summary = CascadeSummary {
        person_id: person.id.clone(),
        previous_officer_id: person.assigned_officer_id.clone(),
        ..CascadeSummary::default()
    };

    match cancel_open_visits(ctx, &person, old_location, conn) {
        Ok(ids) => summary.cancelled_visit_ids = ids,
        Err(e) => summary.record(CascadeStep::CancelVisits, &e),
    }
    if !summary.cancelled_visit_ids.is_empty() {
        notifications::enqueue(
            conn,
            person.contact.as_deref(),
            NotificationTopic::VisitCancelled,
            format!(
                "{} scheduled visit(s) were cancelled after your change of address",
                summary.cancelled_visit_ids.len()
            ),
            ctx.now(),
        );
    }

    match reassign_officer(ctx, &person, conn) {
        Ok(officer_id) => summary.new_officer_id = officer_id,
        Err(e) => summary.record(CascadeStep::ReassignOfficer, &e),
    }

    if let Some(officer_id) = summary.new_officer_id.clone() {
        match schedule_reverification(ctx, &person, &officer_id, previous_address, conn) {
            Ok(visit_id) => summary.reverification_visit_id = Some(visit_id),
            Err(e) => summary.record(CascadeStep::ScheduleReverification, &e),
        }
    }

    match reset_verification(ctx, &person, previous_address, conn) {
        Ok(()) => summary.verification_reset = true,
        Err(e) => summary.record(CascadeStep::ResetVerification, &e),
    }

    Ok(summary)
}

fn cancel_open_visits(
    ctx: &EngineContext,
    person: &Person,
    old_location: &HierarchyPath,
    conn: &mut Connection,
) -> Result<Vec<String>> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    let reason = format!(
        "Person relocated away from station {} beat {}",
        old_location.station_id.as_deref().unwrap_or("unassigned"),
        old_location.beat_id.as_deref().unwrap_or("unassigned")
    );
    let no_guards = TransitionContext::new(&NoEvidence);

    let mut cancelled = Vec::new();
    for visit in VisitRepo::open_for_person(&tx, &person.id)? {
        validate(visit.status, VisitStatus::Cancelled, &no_guards)?;
        VisitRepo::cancel(&tx, &visit.id, &reason, SYSTEM_ACTOR, ctx.now())?;
        cancelled.push(visit.id);
    }
    tx.commit().map_err(from_rusqlite)?;
    Ok(cancelled)
}

fn reassign_officer(
    ctx: &EngineContext,
    person: &Person,
    conn: &mut Connection,
) -> Result<Option<String>> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    let officer_id = assign_officer(&person.location, &tx)?.map(|a| a.officer_id);
    PersonRepo::set_assigned_officer(&tx, &person.id, officer_id.as_deref(), ctx.now())?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(officer_id)
}

/// Book a Verification visit at the first free slot after the lead time
fn schedule_reverification(
    ctx: &EngineContext,
    person: &Person,
    officer_id: &str,
    previous_address: Option<&str>,
    conn: &mut Connection,
) -> Result<String> {
    let scheduling = &ctx.config.scheduling;
    let minutes = scheduling.default_visit_duration_minutes;
    let desired = ctx.now() + Duration::hours(i64::from(scheduling.reverification_lead_hours));
    let horizon = desired
        + Duration::minutes(i64::from(minutes) * i64::from(scheduling.max_slot_search + 1));

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let calendar = VisitRepo::officer_calendar(&tx, officer_id, desired, horizon, minutes)?;
    let window = first_free_window(
        desired,
        minutes,
        VisitType::Verification,
        &calendar,
        scheduling.max_slot_search,
    )
    .ok_or_else(|| {
        BwError::new(BwErrorKind::SchedulingConflict)
            .with_entity_id(officer_id)
            .with_message(format!(
                "no free {}-minute slot for officer {} within {} attempts",
                minutes, officer_id, scheduling.max_slot_search
            ))
    })?;

    let mut spec = NewVisit::new(person.id.clone(), VisitType::Verification, window.start)
        .with_officer(officer_id)
        .with_duration(minutes)
        .with_priority(VisitPriority::High)
        .with_notes("Re-verification after change of address");
    spec.previous_address = previous_address.map(str::to_string);

    let visit = insert_checked(ctx, &tx, person, officer_id, &spec)?;
    tx.commit().map_err(from_rusqlite)?;

    notifications::enqueue(
        conn,
        person.contact.as_deref(),
        NotificationTopic::ReverificationScheduled,
        format!(
            "A re-verification visit is scheduled for {}",
            visit.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        ctx.now(),
    );
    Ok(visit.id)
}

/// Verification back to Pending, with an open request to track it
fn reset_verification(
    ctx: &EngineContext,
    person: &Person,
    previous_address: Option<&str>,
    conn: &mut Connection,
) -> Result<()> {
    let now = ctx.now();
    let remark = match previous_address {
        Some(old) => format!("Address changed from '{}'; re-verification required", old),
        None => "Address changed; re-verification required".to_string(),
    };

    let tx = conn.transaction().map_err(from_rusqlite)?;
    PersonRepo::set_verification(&tx, &person.id, VerificationState::Pending, Some(&remark), now)?;
    if VerificationRepo::latest_open_for_person(&tx, &person.id)?.is_none() {
        VerificationRepo::insert(
            &tx,
            &VerificationRequest {
                id: new_id(),
                person_id: person.id.clone(),
                status: VerificationRequestStatus::Pending,
                officer_id: None,
                method: None,
                remarks: Some(remark),
                completed_at: None,
                created_at: now,
                updated_at: now,
            },
        )?;
    }
    tx.commit().map_err(from_rusqlite)?;
    Ok(())
}

/// Side effects of an approved verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationApproval {
    pub person_id: String,
    /// Request moved to Approved by this call, if any was open
    pub verification_request_id: Option<String>,
    /// Newly issued credential; `None` when one was already on file
    pub credential_issued: Option<String>,
    pub person_verified: bool,
    pub approved_registration_ids: Vec<String>,
}

/// Step the person's open verification request through to Approved
///
/// A Pending request passes through InProgress so every write follows an
/// edge of the table.
pub(crate) fn approve_open_request(
    ctx: &EngineContext,
    conn: &Connection,
    person_id: &str,
    officer_id: Option<&str>,
    method: VerificationMethod,
) -> Result<Option<String>> {
    let Some(mut request) = VerificationRepo::latest_open_for_person(conn, person_id)? else {
        return Ok(None);
    };
    let no_guards = TransitionContext::new(&NoEvidence);
    if request.status == VerificationRequestStatus::Pending {
        validate(request.status, VerificationRequestStatus::InProgress, &no_guards)?;
        request.status = VerificationRequestStatus::InProgress;
    }
    validate(request.status, VerificationRequestStatus::Approved, &no_guards)?;

    let now = ctx.now();
    request.status = VerificationRequestStatus::Approved;
    request.officer_id = officer_id.map(str::to_string).or(request.officer_id);
    request.method = Some(method);
    request.completed_at = Some(now);
    VerificationRepo::update(conn, &request, now)?;
    Ok(Some(request.id))
}

/// Mark the person verified, issue a credential, approve pending registrations
///
/// Registrations whose approval guard is still unmet stay in review.
pub(crate) fn propagate_verification_approval(
    ctx: &EngineContext,
    conn: &Connection,
    person: &Person,
) -> Result<VerificationApproval> {
    let now = ctx.now();
    let mut out = VerificationApproval {
        person_id: person.id.clone(),
        ..VerificationApproval::default()
    };

    PersonRepo::set_verification(conn, &person.id, VerificationState::Verified, None, now)?;

    if person.status == PersonStatus::Pending {
        let no_guards = TransitionContext::new(&NoEvidence);
        validate(person.status, PersonStatus::Verified, &no_guards)?;
        PersonRepo::update_status(conn, &person.id, PersonStatus::Verified, now)?;
        out.person_verified = true;
    }

    let number = credential_number(&ctx.config.credential.prefix, now.year(), &person.id);
    if PersonRepo::issue_credential(conn, &person.id, &number, now)? {
        out.credential_issued = Some(number);
    }

    let guards = SqliteGuards::new(conn);
    for registration in RegistrationRepo::pending_review_for_person(conn, &person.id)? {
        let tctx = TransitionContext::new(&guards).with_linked_person(registration.person_id.as_deref());
        match validate(registration.status, RegistrationStatus::Approved, &tctx) {
            Ok(_) => {
                RegistrationRepo::update_status(
                    conn,
                    &registration.id,
                    RegistrationStatus::Approved,
                    now,
                )?;
                out.approved_registration_ids.push(registration.id);
            }
            Err(e) if e.kind() == BwErrorKind::GuardUnmet => {
                tracing::debug!(
                    registration_id = registration.id.as_str(),
                    reason = e.message(),
                    "registration left in review"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(out)
}
