//! Workload-balanced officer assignment
//!
//! Candidates come from the person's beat when it is set and active,
//! otherwise from the station. The least-loaded active officer wins; ties
//! go to the smallest officer id.

#![allow(clippy::result_large_err)]

use beatwatch_core::assignment::{select_least_loaded, CandidatePool};
use beatwatch_core::model::HierarchyPath;
use beatwatch_core::permissions::PERSON_ASSIGN;
use beatwatch_core::{log_op_end, log_op_error, log_op_start, Caller};
use beatwatch_store::repo::{HierarchyRepo, OfficerRepo, PersonRepo};
use beatwatch_store::Result;
use rusqlite::Connection;

use crate::context::EngineContext;
use crate::reads::load_person_in_scope;

/// The selected officer and the pool it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub officer_id: String,
    pub pool: CandidatePool,
}

/// Pick an officer for `location`; `Ok(None)` means nobody is available
pub fn assign_officer(location: &HierarchyPath, conn: &Connection) -> Result<Option<Assignment>> {
    if let Some(beat_id) = location.beat_id.as_deref() {
        let beat_active = HierarchyRepo::get_beat(conn, beat_id)?.is_some_and(|b| b.is_active);
        if beat_active {
            let loads = OfficerRepo::workload_in_beat(conn, beat_id)?;
            if let Some(pick) = select_least_loaded(&loads) {
                tracing::debug!(beat_id, officer_id = %pick.officer_id, "assigned from beat");
                return Ok(Some(Assignment {
                    officer_id: pick.officer_id.clone(),
                    pool: CandidatePool::Beat,
                }));
            }
        }
    }

    if let Some(station_id) = location.station_id.as_deref() {
        let loads = OfficerRepo::workload_in_station(conn, station_id)?;
        if let Some(pick) = select_least_loaded(&loads) {
            tracing::debug!(station_id, officer_id = %pick.officer_id, "assigned from station");
            return Ok(Some(Assignment {
                officer_id: pick.officer_id.clone(),
                pool: CandidatePool::Station,
            }));
        }
    }

    Ok(None)
}

/// Assign (or clear) the officer responsible for a person
///
/// # Errors
///
/// `Forbidden` without `person:assign`; `NotFound` / `ScopeDenied` for the
/// person. An empty candidate pool is not an error: the person is left
/// unassigned and `None` is returned.
pub fn assign_officer_to_person(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    conn: &mut Connection,
) -> Result<Option<String>> {
    log_op_start!("assign_officer_to_person", person_id = person_id);
    let start = std::time::Instant::now();

    let result = assign_officer_to_person_impl(ctx, caller, person_id, conn).map_err(|e| {
        log_op_error!(
            "assign_officer_to_person",
            &e,
            duration_ms = start.elapsed().as_millis() as u64,
            person_id = person_id
        );
        e
    })?;

    log_op_end!(
        "assign_officer_to_person",
        duration_ms = start.elapsed().as_millis() as u64,
        officer_id = result.as_deref().unwrap_or("none")
    );
    Ok(result)
}

fn assign_officer_to_person_impl(
    ctx: &EngineContext,
    caller: &Caller,
    person_id: &str,
    conn: &mut Connection,
) -> Result<Option<String>> {
    caller.require(PERSON_ASSIGN)?;
    let tx = conn
        .transaction()
        .map_err(beatwatch_store::errors::from_rusqlite)?;

    let person = load_person_in_scope(caller, person_id, &tx)?;
    let officer_id = assign_officer(&person.location, &tx)?.map(|a| a.officer_id);
    PersonRepo::set_assigned_officer(&tx, &person.id, officer_id.as_deref(), ctx.now())?;

    tx.commit().map_err(beatwatch_store::errors::from_rusqlite)?;
    Ok(officer_id)
}
