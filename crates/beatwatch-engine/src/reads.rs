//! Scope-filtered reads
//!
//! List operations intersect every query with the caller's scope and
//! return only what matches, so an out-of-scope or unbound caller simply
//! sees nothing. Single-record reads answer `ScopeDenied` instead.

#![allow(clippy::result_large_err)]

use beatwatch_core::errors::BeatwatchError;
use beatwatch_core::model::{EmergencyAlert, Officer, Person, Visit, VisitType};
use beatwatch_core::scope::{ensure_in_scope, Field, FilterBuilder, Value};
use beatwatch_core::workflow::{AlertStatus, PersonStatus, VisitStatus, WorkflowState};
use beatwatch_core::{log_op_end, log_op_error, log_op_start, resolve_scope, Caller};
use beatwatch_store::repo::{AlertRepo, OfficerRepo, Page, PersonRepo, VisitRepo};
use beatwatch_store::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Filters accepted by [`list_people`]
#[derive(Debug, Clone, Default)]
pub struct PersonQuery {
    /// Case-insensitive match on name, contact or address
    pub search: Option<String>,
    pub status: Option<PersonStatus>,
    pub verification_status: Option<String>,
    pub vulnerability_level: Option<String>,
    pub station_id: Option<String>,
    pub beat_id: Option<String>,
}

/// Filters accepted by [`list_visits`]
#[derive(Debug, Clone, Default)]
pub struct VisitQuery {
    pub person_id: Option<String>,
    pub officer_id: Option<String>,
    pub status: Option<VisitStatus>,
    pub visit_type: Option<VisitType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub fn list_people(
    caller: &Caller,
    query: &PersonQuery,
    page: Page,
    conn: &Connection,
) -> Result<Vec<Person>> {
    let scope = resolve_scope(caller);
    let predicate = FilterBuilder::new(&scope)
        .search(
            query.search.as_deref().unwrap_or_default(),
            &[Field::FullName, Field::Contact, Field::Address],
        )
        .exact_opt(Field::Status, query.status.map(|s| Value::text(s.as_str())))
        .exact_opt(
            Field::VerificationStatus,
            query.verification_status.clone().map(Value::Text),
        )
        .exact_opt(
            Field::VulnerabilityLevel,
            query.vulnerability_level.clone().map(Value::Text),
        )
        .exact_opt(Field::StationId, query.station_id.clone().map(Value::Text))
        .exact_opt(Field::BeatId, query.beat_id.clone().map(Value::Text))
        .build();
    PersonRepo::list(conn, &predicate, page)
}

pub fn count_people(caller: &Caller, conn: &Connection) -> Result<u64> {
    let predicate = FilterBuilder::new(&resolve_scope(caller)).build();
    PersonRepo::count(conn, &predicate)
}

/// # Errors
///
/// `NotFound` for an unknown id, `ScopeDenied` outside the caller's scope.
pub fn get_person(caller: &Caller, person_id: &str, conn: &Connection) -> Result<Person> {
    log_op_start!("get_person", person_id = person_id);
    let start = std::time::Instant::now();

    let result = load_person_in_scope(caller, person_id, conn).map_err(|e| {
        log_op_error!(
            "get_person",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "get_person",
        duration_ms = start.elapsed().as_millis() as u64
    );
    Ok(result)
}

pub fn list_visits(
    caller: &Caller,
    query: &VisitQuery,
    page: Page,
    conn: &Connection,
) -> Result<Vec<Visit>> {
    let predicate = FilterBuilder::new(&resolve_scope(caller))
        .exact_opt(Field::PersonId, query.person_id.clone().map(Value::Text))
        .exact_opt(Field::OfficerId, query.officer_id.clone().map(Value::Text))
        .exact_opt(Field::Status, query.status.map(|s| Value::text(s.as_str())))
        .exact_opt(
            Field::VisitType,
            query.visit_type.map(|t| Value::text(t.as_str())),
        )
        .between(
            Field::ScheduledAt,
            query.from.map(Value::Timestamp),
            query.to.map(Value::Timestamp),
        )
        .build();
    VisitRepo::list(conn, &predicate, page)
}

/// # Errors
///
/// `NotFound` for an unknown id, `ScopeDenied` outside the caller's scope.
pub fn get_visit(caller: &Caller, visit_id: &str, conn: &Connection) -> Result<Visit> {
    load_visit_in_scope(caller, visit_id, conn)
}

pub fn list_alerts(
    caller: &Caller,
    status: Option<AlertStatus>,
    page: Page,
    conn: &Connection,
) -> Result<Vec<EmergencyAlert>> {
    let predicate = FilterBuilder::new(&resolve_scope(caller))
        .exact_opt(Field::Status, status.map(|s| Value::text(s.as_str())))
        .build();
    AlertRepo::list(conn, &predicate, page)
}

/// # Errors
///
/// `NotFound` for an unknown id, `ScopeDenied` outside the caller's scope.
pub fn get_alert(caller: &Caller, alert_id: &str, conn: &Connection) -> Result<EmergencyAlert> {
    load_alert_in_scope(caller, alert_id, conn)
}

/// Active officers visible to the caller
pub fn list_officers(caller: &Caller, conn: &Connection) -> Result<Vec<Officer>> {
    let predicate = FilterBuilder::new(&resolve_scope(caller))
        .exact(Field::IsActive, Value::Bool(true))
        .build();
    OfficerRepo::list(conn, &predicate)
}

pub(crate) fn load_person_in_scope(
    caller: &Caller,
    person_id: &str,
    conn: &Connection,
) -> Result<Person> {
    let person = PersonRepo::get(conn, person_id)?.ok_or_else(|| BeatwatchError::PersonNotFound {
        person_id: person_id.to_string(),
    })?;
    ensure_in_scope(&resolve_scope(caller), "Person", &person.id, &person.location)?;
    Ok(person)
}

pub(crate) fn load_visit_in_scope(
    caller: &Caller,
    visit_id: &str,
    conn: &Connection,
) -> Result<Visit> {
    let visit = VisitRepo::get(conn, visit_id)?.ok_or_else(|| BeatwatchError::VisitNotFound {
        visit_id: visit_id.to_string(),
    })?;
    ensure_in_scope(&resolve_scope(caller), "Visit", &visit.id, &visit.location)?;
    Ok(visit)
}

pub(crate) fn load_alert_in_scope(
    caller: &Caller,
    alert_id: &str,
    conn: &Connection,
) -> Result<EmergencyAlert> {
    let alert = AlertRepo::get(conn, alert_id)?.ok_or_else(|| BeatwatchError::AlertNotFound {
        alert_id: alert_id.to_string(),
    })?;
    ensure_in_scope(&resolve_scope(caller), "EmergencyAlert", &alert.id, &alert.location)?;
    Ok(alert)
}

pub(crate) fn load_officer_in_scope(
    caller: &Caller,
    officer_id: &str,
    conn: &Connection,
) -> Result<Officer> {
    let officer = OfficerRepo::get(conn, officer_id)?.ok_or_else(|| {
        BeatwatchError::OfficerNotFound {
            officer_id: officer_id.to_string(),
        }
    })?;
    ensure_in_scope(&resolve_scope(caller), "Officer", &officer.id, &officer.assignment)?;
    Ok(officer)
}
