//! Status transitions for every entity kind
//!
//! Each operation loads the record, checks permission and scope, runs the
//! transition validator and writes every record the transition touches in
//! one transaction. A same-state request is accepted and writes nothing.

#![allow(clippy::result_large_err)]

use beatwatch_core::errors::BeatwatchError;
use beatwatch_core::model::{
    EmergencyAlert, Registration, VerificationMethod, VerificationState, Visit, VisitType,
    VulnerabilityLevel,
};
use beatwatch_core::notify::NotificationTopic;
use beatwatch_core::permissions::{
    ALERT_UPDATE_STATUS, PERSON_UPDATE_STATUS, REGISTRATION_REVIEW, VERIFICATION_UPDATE_STATUS,
    VISIT_UPDATE_STATUS,
};
use beatwatch_core::workflow::{
    parse_state, validate, AlertStatus, NoEvidence, PersonStatus, RegistrationStatus, Transition,
    TransitionContext, VerificationRequestStatus, VisitStatus, WorkflowState,
};
use beatwatch_core::{log_op_end, log_op_error, log_op_start, Caller};
use beatwatch_store::errors::from_rusqlite;
use beatwatch_store::repo::{AlertRepo, PersonRepo, RegistrationRepo, VerificationRepo, VisitRepo};
use beatwatch_store::{Result, SqliteGuards};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::cascade::{approve_open_request, propagate_verification_approval, VerificationApproval};
use crate::context::EngineContext;
use crate::notifications;
use crate::reads::{load_alert_in_scope, load_person_in_scope, load_visit_in_scope};

macro_rules! logged {
    ($op:expr, $body:expr, $($field:tt)*) => {{
        log_op_start!($op, $($field)*);
        let start = std::time::Instant::now();
        let result = $body.map_err(|e| {
            log_op_error!($op, &e, duration_ms = start.elapsed().as_millis() as u64, $($field)*);
            e
        })?;
        log_op_end!($op, duration_ms = start.elapsed().as_millis() as u64);
        Ok(result)
    }};
}

fn not_found_visit(visit_id: &str) -> BeatwatchError {
    BeatwatchError::VisitNotFound {
        visit_id: visit_id.to_string(),
    }
}

// ========== Person ==========

/// Move a person through its lifecycle
///
/// Deactivating (Inactive, Deceased) also cancels the person's open visits
/// in the same transaction.
///
/// # Errors
///
/// `Forbidden`, `NotFound`, `ScopeDenied`, `UnknownState` or
/// `InvalidTransition`.
pub fn update_person_status(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    to: &str,
    conn: &mut Connection,
) -> Result<Transition<PersonStatus>> {
    logged!(
        "update_person_status",
        update_person_status_impl(ctx, caller, person_id, to, conn),
        person_id = person_id,
        to = to
    )
}

fn update_person_status_impl(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    to: &str,
    conn: &mut Connection,
) -> Result<Transition<PersonStatus>> {
    caller.require(PERSON_UPDATE_STATUS)?;
    let to = parse_state::<PersonStatus>(to)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let person = load_person_in_scope(caller, person_id, &tx)?;
    let transition = validate(person.status, to, &TransitionContext::new(&NoEvidence))?;
    if transition.is_noop() {
        return Ok(transition);
    }

    let now = ctx.now();
    PersonRepo::update_status(&tx, &person.id, to, now)?;
    if !to.is_active() {
        let reason = format!("Person marked {}", to.as_str());
        for visit in VisitRepo::open_for_person(&tx, &person.id)? {
            VisitRepo::cancel(&tx, &visit.id, &reason, caller.actor_id(), now)?;
        }
    }
    tx.commit().map_err(from_rusqlite)?;
    Ok(transition)
}

// ========== Verification requests ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: VerificationRequestStatus,
    /// Present when this call approved the request
    pub approval: Option<VerificationApproval>,
}

/// Transition a verification request
///
/// Approval marks the person verified, issues a credential if none is on
/// file and approves registrations whose guard is met. Rejection marks the
/// person's verification Rejected. Both happen atomically with the request.
///
/// # Errors
///
/// `Forbidden`, `NotFound`, `ScopeDenied`, `UnknownState` or
/// `InvalidTransition`.
pub fn update_verification_status(
    ctx: &EngineContext,
    caller: &Caller,
    request_id: &str,
    to: &str,
    method: Option<VerificationMethod>,
    remarks: Option<String>,
    conn: &mut Connection,
) -> Result<VerificationOutcome> {
    logged!(
        "update_verification_status",
        update_verification_status_impl(ctx, caller, request_id, to, method, remarks, conn),
        request_id = request_id,
        to = to
    )
}

fn update_verification_status_impl(
    ctx: &EngineContext,
    caller: &Caller,
    request_id: &str,
    to: &str,
    method: Option<VerificationMethod>,
    remarks: Option<String>,
    conn: &mut Connection,
) -> Result<VerificationOutcome> {
    caller.require(VERIFICATION_UPDATE_STATUS)?;
    let to = parse_state::<VerificationRequestStatus>(to)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let mut request = VerificationRepo::get(&tx, request_id)?.ok_or_else(|| {
        BeatwatchError::VerificationRequestNotFound {
            request_id: request_id.to_string(),
        }
    })?;
    let person = load_person_in_scope(caller, &request.person_id, &tx)?;

    let transition = validate(request.status, to, &TransitionContext::new(&NoEvidence))?;
    if transition.is_noop() {
        return Ok(VerificationOutcome {
            status: to,
            approval: None,
        });
    }

    let now = ctx.now();
    request.status = to;
    request.method = method.or(request.method);
    request.remarks = remarks.clone().or(request.remarks);
    if let Some(officer_id) = &caller.officer_id {
        request.officer_id = Some(officer_id.clone());
    }
    if to.is_terminal() {
        request.completed_at = Some(now);
    }
    VerificationRepo::update(&tx, &request, now)?;

    let approval = match to {
        VerificationRequestStatus::Approved => {
            let mut approval = propagate_verification_approval(ctx, &tx, &person)?;
            approval.verification_request_id = Some(request.id.clone());
            Some(approval)
        }
        VerificationRequestStatus::Rejected => {
            PersonRepo::set_verification(
                &tx,
                &person.id,
                VerificationState::Rejected,
                remarks.as_deref(),
                now,
            )?;
            None
        }
        _ => None,
    };
    tx.commit().map_err(from_rusqlite)?;

    if let Some(number) = approval.as_ref().and_then(|a| a.credential_issued.as_deref()) {
        notifications::enqueue(
            conn,
            person.contact.as_deref(),
            NotificationTopic::CredentialIssued,
            format!("Your verification is complete. Credential number: {}", number),
            now,
        );
    }
    Ok(VerificationOutcome {
        status: to,
        approval,
    })
}

// ========== Visits ==========

/// Result of completing a visit
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCompletion {
    pub visit: Visit,
    /// Present when a Verification visit approved the person
    pub approval: Option<VerificationApproval>,
}

/// What the officer recorded at the end of a visit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitOutcome {
    /// 0-100; sets the person's vulnerability level
    pub risk_score: Option<u8>,
    pub notes: Option<String>,
}

/// Scheduled to InProgress
///
/// # Errors
///
/// `Forbidden`, `NotFound`, `ScopeDenied` or `InvalidTransition`.
pub fn start_visit(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    conn: &mut Connection,
) -> Result<Visit> {
    logged!(
        "start_visit",
        start_visit_impl(ctx, caller, visit_id, conn),
        visit_id = visit_id
    )
}

fn start_visit_impl(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    conn: &mut Connection,
) -> Result<Visit> {
    caller.require(VISIT_UPDATE_STATUS)?;
    let tx = conn.transaction().map_err(from_rusqlite)?;
    let visit = load_visit_in_scope(caller, visit_id, &tx)?;
    let transition = validate(
        visit.status,
        VisitStatus::InProgress,
        &TransitionContext::new(&NoEvidence),
    )?;
    if transition.is_noop() {
        return Ok(visit);
    }
    VisitRepo::mark_started(&tx, &visit.id, ctx.now())?;
    let visit = VisitRepo::get(&tx, &visit.id)?.ok_or_else(|| not_found_visit(visit_id))?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(visit)
}

/// InProgress to Completed, recording the outcome on the person
///
/// Completing a Verification visit approves the person's open
/// verification request (method Physical), marks the person verified,
/// issues a credential and approves pending registrations, all in the
/// same transaction as the visit.
///
/// # Errors
///
/// `InvalidInput` for a risk score above 100, otherwise as
/// [`start_visit`].
pub fn complete_visit(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    outcome: VisitOutcome,
    conn: &mut Connection,
) -> Result<VisitCompletion> {
    logged!(
        "complete_visit",
        complete_visit_impl(ctx, caller, visit_id, outcome, conn),
        visit_id = visit_id
    )
}

fn complete_visit_impl(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    outcome: VisitOutcome,
    conn: &mut Connection,
) -> Result<VisitCompletion> {
    caller.require(VISIT_UPDATE_STATUS)?;
    if let Some(score) = outcome.risk_score.filter(|s| *s > 100) {
        return Err(BeatwatchError::InvalidInput {
            reason: format!("risk score must be between 0 and 100, got {}", score),
        }
        .into());
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let visit = load_visit_in_scope(caller, visit_id, &tx)?;
    let transition = validate(
        visit.status,
        VisitStatus::Completed,
        &TransitionContext::new(&NoEvidence),
    )?;
    if transition.is_noop() {
        return Ok(VisitCompletion {
            visit,
            approval: None,
        });
    }

    let now = ctx.now();
    VisitRepo::complete(
        &tx,
        &visit.id,
        outcome.risk_score,
        outcome.notes.as_deref(),
        now,
    )?;

    let person = PersonRepo::get(&tx, &visit.person_id)?.ok_or_else(|| {
        BeatwatchError::PersonNotFound {
            person_id: visit.person_id.clone(),
        }
    })?;
    PersonRepo::record_visit_outcome(
        &tx,
        &person.id,
        outcome.risk_score.map(VulnerabilityLevel::from_risk_score),
        now,
    )?;

    let approval = if visit.visit_type == VisitType::Verification {
        let request_id = approve_open_request(
            ctx,
            &tx,
            &person.id,
            Some(visit.officer_id.as_str()),
            VerificationMethod::Physical,
        )?;
        let mut approval = propagate_verification_approval(ctx, &tx, &person)?;
        approval.verification_request_id = request_id;
        Some(approval)
    } else {
        None
    };

    let visit = VisitRepo::get(&tx, &visit.id)?.ok_or_else(|| not_found_visit(visit_id))?;
    tx.commit().map_err(from_rusqlite)?;

    notifications::enqueue(
        conn,
        person.contact.as_deref(),
        NotificationTopic::VisitCompleted,
        format!("Your {} visit has been completed", visit.visit_type.as_str()),
        now,
    );
    if let Some(number) = approval.as_ref().and_then(|a| a.credential_issued.as_deref()) {
        notifications::enqueue(
            conn,
            person.contact.as_deref(),
            NotificationTopic::CredentialIssued,
            format!("Your verification is complete. Credential number: {}", number),
            now,
        );
    }

    Ok(VisitCompletion { visit, approval })
}

/// Scheduled or InProgress to Cancelled, recording reason and actor
///
/// # Errors
///
/// `InvalidInput` for a blank reason, otherwise as [`start_visit`].
pub fn cancel_visit(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    reason: &str,
    conn: &mut Connection,
) -> Result<Visit> {
    logged!(
        "cancel_visit",
        cancel_visit_impl(ctx, caller, visit_id, reason, conn),
        visit_id = visit_id
    )
}

fn cancel_visit_impl(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    reason: &str,
    conn: &mut Connection,
) -> Result<Visit> {
    caller.require(VISIT_UPDATE_STATUS)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(BeatwatchError::InvalidInput {
            reason: "a cancellation reason is required".to_string(),
        }
        .into());
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let visit = load_visit_in_scope(caller, visit_id, &tx)?;
    let transition = validate(
        visit.status,
        VisitStatus::Cancelled,
        &TransitionContext::new(&NoEvidence),
    )?;
    if transition.is_noop() {
        return Ok(visit);
    }
    VisitRepo::cancel(&tx, &visit.id, reason, caller.actor_id(), ctx.now())?;
    let visit = VisitRepo::get(&tx, &visit.id)?.ok_or_else(|| not_found_visit(visit_id))?;
    let contact = PersonRepo::get(&tx, &visit.person_id)?.and_then(|p| p.contact);
    tx.commit().map_err(from_rusqlite)?;

    notifications::enqueue(
        conn,
        contact.as_deref(),
        NotificationTopic::VisitCancelled,
        format!("Your visit was cancelled: {}", reason),
        ctx.now(),
    );
    Ok(visit)
}

/// String-level visit transition for callers that only carry a status name
///
/// # Errors
///
/// `UnknownState` for an unrecognised status, `InvalidTransition` for
/// Scheduled, otherwise as the specific operation.
pub fn update_visit_status(
    ctx: &EngineContext,
    caller: &Caller,
    visit_id: &str,
    to: &str,
    conn: &mut Connection,
) -> Result<Visit> {
    match parse_state::<VisitStatus>(to)? {
        VisitStatus::InProgress => start_visit(ctx, caller, visit_id, conn),
        VisitStatus::Completed => {
            complete_visit(ctx, caller, visit_id, VisitOutcome::default(), conn).map(|c| c.visit)
        }
        VisitStatus::Cancelled => {
            let reason = format!("Cancelled by {}", caller.actor_id());
            cancel_visit(ctx, caller, visit_id, &reason, conn)
        }
        VisitStatus::Scheduled => {
            caller.require(VISIT_UPDATE_STATUS)?;
            let visit = load_visit_in_scope(caller, visit_id, conn)?;
            validate(
                visit.status,
                VisitStatus::Scheduled,
                &TransitionContext::new(&NoEvidence),
            )?;
            Ok(visit)
        }
    }
}

// ========== Emergency alerts ==========

/// Move an alert along Active, Responded, Resolved (or FalseAlarm)
///
/// Responding stamps `responded_at` and the responder; resolving stamps
/// `resolved_at`.
///
/// # Errors
///
/// `Forbidden`, `NotFound`, `ScopeDenied`, `UnknownState` or
/// `InvalidTransition`.
pub fn update_alert_status(
    ctx: &EngineContext,
    caller: &Caller,
    alert_id: &str,
    to: &str,
    notes: Option<String>,
    conn: &mut Connection,
) -> Result<EmergencyAlert> {
    logged!(
        "update_alert_status",
        update_alert_status_impl(ctx, caller, alert_id, to, notes, conn),
        alert_id = alert_id,
        to = to
    )
}

fn update_alert_status_impl(
    ctx: &EngineContext,
    caller: &Caller,
    alert_id: &str,
    to: &str,
    notes: Option<String>,
    conn: &mut Connection,
) -> Result<EmergencyAlert> {
    caller.require(ALERT_UPDATE_STATUS)?;
    let to = parse_state::<AlertStatus>(to)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let mut alert = load_alert_in_scope(caller, alert_id, &tx)?;
    let transition = validate(alert.status, to, &TransitionContext::new(&NoEvidence))?;
    if transition.is_noop() {
        return Ok(alert);
    }

    let now = ctx.now();
    match to {
        AlertStatus::Responded => {
            alert.responded_at = Some(now);
            alert.responded_by = Some(caller.actor_id().to_string());
        }
        AlertStatus::Resolved => alert.resolved_at = Some(now),
        AlertStatus::Active | AlertStatus::FalseAlarm => {}
    }
    alert.status = to;
    alert.notes = notes.or(alert.notes);
    AlertRepo::update(&tx, &alert)?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(alert)
}

// ========== Registrations ==========

/// Review a registration
///
/// PendingReview to Approved needs a linked person with a Completed
/// Verification visit. Approval also moves a still-Pending person to
/// Verified in the same transaction.
///
/// # Errors
///
/// `GuardUnmet` when the approval precondition fails, otherwise
/// `Forbidden`, `NotFound`, `ScopeDenied`, `UnknownState` or
/// `InvalidTransition`.
pub fn update_registration_status(
    ctx: &EngineContext,
    caller: &Caller,
    registration_id: &str,
    to: &str,
    conn: &mut Connection,
) -> Result<Registration> {
    logged!(
        "update_registration_status",
        update_registration_status_impl(ctx, caller, registration_id, to, conn),
        registration_id = registration_id,
        to = to
    )
}

fn update_registration_status_impl(
    ctx: &EngineContext,
    caller: &Caller,
    registration_id: &str,
    to: &str,
    conn: &mut Connection,
) -> Result<Registration> {
    caller.require(REGISTRATION_REVIEW)?;
    let to = parse_state::<RegistrationStatus>(to)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let mut registration = load_registration(&tx, registration_id)?;
    let person = match registration.person_id.as_deref() {
        Some(pid) => Some(load_person_in_scope(caller, pid, &tx)?),
        None => None,
    };

    let guards = SqliteGuards::new(&tx);
    let tctx = TransitionContext::new(&guards).with_linked_person(registration.person_id.as_deref());
    let transition = validate(registration.status, to, &tctx)?;
    if transition.is_noop() {
        return Ok(registration);
    }

    let now = ctx.now();
    RegistrationRepo::update_status(&tx, &registration.id, to, now)?;
    if to == RegistrationStatus::Approved {
        if let Some(person) = person.filter(|p| p.status == PersonStatus::Pending) {
            validate(
                person.status,
                PersonStatus::Verified,
                &TransitionContext::new(&NoEvidence),
            )?;
            PersonRepo::update_status(&tx, &person.id, PersonStatus::Verified, now)?;
            PersonRepo::set_verification(&tx, &person.id, VerificationState::Verified, None, now)?;
        }
    }
    tx.commit().map_err(from_rusqlite)?;

    registration.status = to;
    registration.updated_at = now;
    Ok(registration)
}

/// Attach a confirmed person to a registration
///
/// # Errors
///
/// `Forbidden`, `NotFound` for either record, `ScopeDenied` for the person.
pub fn link_registration(
    ctx: &EngineContext,
    caller: &Caller,
    registration_id: &str,
    person_id: &str,
    conn: &mut Connection,
) -> Result<Registration> {
    logged!(
        "link_registration",
        link_registration_impl(ctx, caller, registration_id, person_id, conn),
        registration_id = registration_id,
        person_id = person_id
    )
}

fn link_registration_impl(
    ctx: &EngineContext,
    caller: &Caller,
    registration_id: &str,
    person_id: &str,
    conn: &mut Connection,
) -> Result<Registration> {
    caller.require(REGISTRATION_REVIEW)?;
    let tx = conn.transaction().map_err(from_rusqlite)?;
    let mut registration = load_registration(&tx, registration_id)?;
    let person = load_person_in_scope(caller, person_id, &tx)?;
    let now = ctx.now();
    RegistrationRepo::link_person(&tx, &registration.id, &person.id, now)?;
    tx.commit().map_err(from_rusqlite)?;

    registration.person_id = Some(person.id);
    registration.updated_at = now;
    Ok(registration)
}

fn load_registration(conn: &Connection, registration_id: &str) -> Result<Registration> {
    RegistrationRepo::get(conn, registration_id)?.ok_or_else(|| {
        BeatwatchError::RegistrationNotFound {
            registration_id: registration_id.to_string(),
        }
        .into()
    })
}
