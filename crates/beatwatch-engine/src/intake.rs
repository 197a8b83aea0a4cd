//! Direct person entry and self-service registration drafts

#![allow(clippy::result_large_err)]

use beatwatch_core::errors::BeatwatchError;
use beatwatch_core::model::{
    new_id, HierarchyPath, Person, Registration, VerificationRequest,
};
use beatwatch_core::permissions::PERSON_CREATE;
use beatwatch_core::scope::ensure_in_scope;
use beatwatch_core::workflow::{RegistrationStatus, VerificationRequestStatus};
use beatwatch_core::{log_op_end, log_op_error, log_op_start, resolve_scope, Caller};
use beatwatch_store::errors::from_rusqlite;
use beatwatch_store::repo::{HierarchyRepo, PersonRepo, RegistrationRepo, VerificationRepo};
use beatwatch_store::Result;
use rusqlite::Connection;

use crate::assignment::assign_officer;
use crate::context::EngineContext;

/// Input for [`create_person`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub full_name: String,
    pub contact: Option<String>,
    pub address: String,
    pub station_id: String,
    pub beat_id: Option<String>,
}

/// Enter a person directly, placed at a station (and optionally a beat)
///
/// The person starts Pending with an open verification request and, when
/// one is available, an assigned officer.
///
/// # Errors
///
/// - `Forbidden` without `person:create`
/// - `InvalidInput` for a blank name or address, or a beat outside the station
/// - `NotFound` for the station; `ScopeDenied` when it lies outside the
///   caller's scope
pub fn create_person(
    ctx: &EngineContext,
    caller: &Caller,
    input: &NewPerson,
    conn: &mut Connection,
) -> Result<Person> {
    log_op_start!("create_person", station_id = input.station_id.as_str());
    let start = std::time::Instant::now();

    let result = create_person_impl(ctx, caller, input, conn).map_err(|e| {
        log_op_error!(
            "create_person",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "create_person",
        duration_ms = start.elapsed().as_millis() as u64,
        person_id = result.id.as_str()
    );
    Ok(result)
}

fn create_person_impl(
    ctx: &EngineContext,
    caller: &Caller,
    input: &NewPerson,
    conn: &mut Connection,
) -> Result<Person> {
    caller.require(PERSON_CREATE)?;
    let full_name = input.full_name.trim();
    let address = input.address.trim();
    if full_name.is_empty() || address.is_empty() {
        return Err(BeatwatchError::InvalidInput {
            reason: "name and address are required".to_string(),
        }
        .into());
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let location = resolve_location(&tx, &input.station_id, input.beat_id.as_deref())?;
    let id = new_id();
    ensure_in_scope(&resolve_scope(caller), "Person", &id, &location)?;

    let now = ctx.now();
    let mut person = Person::new(id, full_name, address, location, now);
    person.contact = input.contact.clone().filter(|c| !c.trim().is_empty());
    person.assigned_officer_id = assign_officer(&person.location, &tx)?.map(|a| a.officer_id);
    PersonRepo::insert(&tx, &person)?;

    VerificationRepo::insert(
        &tx,
        &VerificationRequest {
            id: new_id(),
            person_id: person.id.clone(),
            status: VerificationRequestStatus::Pending,
            officer_id: None,
            method: None,
            remarks: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        },
    )?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(person)
}

/// Start a self-service registration draft (InProgress, unlinked)
///
/// # Errors
///
/// `InvalidInput` for a blank applicant name.
pub fn submit_registration(
    ctx: &EngineContext,
    applicant_name: &str,
    contact: Option<&str>,
    conn: &Connection,
) -> Result<Registration> {
    let applicant_name = applicant_name.trim();
    if applicant_name.is_empty() {
        return Err(BeatwatchError::InvalidInput {
            reason: "applicant name is required".to_string(),
        }
        .into());
    }
    let now = ctx.now();
    let registration = Registration {
        id: new_id(),
        person_id: None,
        applicant_name: applicant_name.to_string(),
        contact: contact.map(str::to_string),
        status: RegistrationStatus::InProgress,
        created_at: now,
        updated_at: now,
    };
    RegistrationRepo::insert(conn, &registration)?;
    tracing::debug!(registration_id = registration.id.as_str(), "registration submitted");
    Ok(registration)
}

/// Full hierarchy path for a station and optional beat of that station
pub(crate) fn resolve_location(
    conn: &Connection,
    station_id: &str,
    beat_id: Option<&str>,
) -> Result<HierarchyPath> {
    let station = HierarchyRepo::get_station(conn, station_id)?.ok_or_else(|| {
        BeatwatchError::StationNotFound {
            station_id: station_id.to_string(),
        }
    })?;
    if let Some(beat_id) = beat_id {
        let belongs = HierarchyRepo::get_beat(conn, beat_id)?
            .is_some_and(|b| b.station_id == station.station_id);
        if !belongs {
            return Err(BeatwatchError::InvalidInput {
                reason: format!(
                    "beat {} does not belong to station {}",
                    beat_id, station.station_id
                ),
            }
            .into());
        }
    }
    Ok(HierarchyPath::from_station(
        &station,
        beat_id.map(str::to_string),
    ))
}
