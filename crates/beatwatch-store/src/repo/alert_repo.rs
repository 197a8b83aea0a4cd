#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, ms_opt, parsed_at, path_at, time_at, time_opt_at, PATH_COLUMNS};
use crate::repo::Page;
use crate::sql::render;
use beatwatch_core::model::EmergencyAlert;
use beatwatch_core::scope::Predicate;
use beatwatch_core::workflow::{AlertStatus, WorkflowState};
use rusqlite::{Connection, OptionalExtension, Row};

pub struct AlertRepo;

fn select_sql(where_clause: &str) -> String {
    format!(
        "SELECT id, person_id, {}, status, notes, responded_by, created_at, responded_at,
                resolved_at
         FROM emergency_alerts WHERE {}",
        PATH_COLUMNS, where_clause
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<EmergencyAlert> {
    Ok(EmergencyAlert {
        id: row.get(0)?,
        person_id: row.get(1)?,
        location: path_at(row, 2)?,
        status: parsed_at(row, 7, AlertStatus::parse)?,
        notes: row.get(8)?,
        responded_by: row.get(9)?,
        created_at: time_at(row, 10)?,
        responded_at: time_opt_at(row, 11)?,
        resolved_at: time_opt_at(row, 12)?,
    })
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<EmergencyAlert>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params, map_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

impl AlertRepo {
    /// A second Active alert for the same person fails with
    /// `ConstraintViolation` from the partial unique index
    pub fn insert(conn: &Connection, a: &EmergencyAlert) -> Result<()> {
        let loc = &a.location;
        conn.execute(
            "INSERT INTO emergency_alerts (id, person_id, region_id, district_id, sub_area_id,
                                           station_id, beat_id, status, notes, responded_by,
                                           created_at, responded_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                a.id,
                a.person_id,
                loc.region_id,
                loc.district_id,
                loc.sub_area_id,
                loc.station_id,
                loc.beat_id,
                a.status.as_str(),
                a.notes,
                a.responded_by,
                ms(a.created_at),
                ms_opt(a.responded_at),
                ms_opt(a.resolved_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(conn: &Connection, alert_id: &str) -> Result<Option<EmergencyAlert>> {
        conn.query_row(&select_sql("id = ?1"), [alert_id], map_row)
            .optional()
            .map_err(from_rusqlite)
    }

    pub fn active_for_person(conn: &Connection, person_id: &str) -> Result<Option<EmergencyAlert>> {
        conn.query_row(
            &select_sql("person_id = ?1 AND status = 'Active'"),
            [person_id],
            map_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Newest first
    pub fn list(conn: &Connection, predicate: &Predicate, page: Page) -> Result<Vec<EmergencyAlert>> {
        let filter = render(predicate);
        let sql = format!(
            "{} ORDER BY created_at DESC, id LIMIT {} OFFSET {}",
            select_sql(&filter.clause),
            page.limit,
            page.offset
        );
        collect(conn, &sql, filter.params())
    }

    /// Active and Responded alerts, oldest first
    pub fn list_open(conn: &Connection) -> Result<Vec<EmergencyAlert>> {
        let sql = format!(
            "{} ORDER BY created_at, id",
            select_sql("status IN ('Active', 'Responded')")
        );
        collect(conn, &sql, [])
    }

    /// Write status, responder and lifecycle timestamps as held on `a`
    pub fn update(conn: &Connection, a: &EmergencyAlert) -> Result<()> {
        conn.execute(
            "UPDATE emergency_alerts
             SET status = ?2, notes = ?3, responded_by = ?4, responded_at = ?5, resolved_at = ?6
             WHERE id = ?1",
            rusqlite::params![
                a.id,
                a.status.as_str(),
                a.notes,
                a.responded_by,
                ms_opt(a.responded_at),
                ms_opt(a.resolved_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }
}
