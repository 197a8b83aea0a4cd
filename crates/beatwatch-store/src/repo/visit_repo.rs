#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, ms_opt, parsed_at, path_at, time_at, time_opt_at, PATH_COLUMNS};
use crate::repo::Page;
use crate::sql::render;
use beatwatch_core::model::{Visit, VisitPriority, VisitType};
use beatwatch_core::scope::Predicate;
use beatwatch_core::workflow::{VisitStatus, WorkflowState};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

pub struct VisitRepo;

fn select_sql(where_clause: &str) -> String {
    format!(
        "SELECT id, person_id, officer_id, {}, visit_type, priority, status, scheduled_at,
                duration_minutes, notes, previous_address, risk_score, started_at,
                completed_at, cancelled_at, cancelled_by, cancel_reason, created_at, updated_at
         FROM visits WHERE {}",
        PATH_COLUMNS, where_clause
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        person_id: row.get(1)?,
        officer_id: row.get(2)?,
        location: path_at(row, 3)?,
        visit_type: parsed_at(row, 8, VisitType::parse)?,
        priority: parsed_at(row, 9, VisitPriority::parse)?,
        status: parsed_at(row, 10, VisitStatus::parse)?,
        scheduled_at: time_at(row, 11)?,
        duration_minutes: row.get(12)?,
        notes: row.get(13)?,
        previous_address: row.get(14)?,
        risk_score: row.get(15)?,
        started_at: time_opt_at(row, 16)?,
        completed_at: time_opt_at(row, 17)?,
        cancelled_at: time_opt_at(row, 18)?,
        cancelled_by: row.get(19)?,
        cancel_reason: row.get(20)?,
        created_at: time_at(row, 21)?,
        updated_at: time_at(row, 22)?,
    })
}

fn collect(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Visit>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params, map_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

impl VisitRepo {
    pub fn insert(conn: &Connection, v: &Visit) -> Result<()> {
        let loc = &v.location;
        conn.execute(
            "INSERT INTO visits (id, person_id, officer_id, region_id, district_id, sub_area_id,
                                 station_id, beat_id, visit_type, priority, status, scheduled_at,
                                 duration_minutes, notes, previous_address, risk_score,
                                 started_at, completed_at, cancelled_at, cancelled_by,
                                 cancel_reason, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            rusqlite::params![
                v.id,
                v.person_id,
                v.officer_id,
                loc.region_id,
                loc.district_id,
                loc.sub_area_id,
                loc.station_id,
                loc.beat_id,
                v.visit_type.as_str(),
                v.priority.as_str(),
                v.status.as_str(),
                ms(v.scheduled_at),
                v.duration_minutes,
                v.notes,
                v.previous_address,
                v.risk_score,
                ms_opt(v.started_at),
                ms_opt(v.completed_at),
                ms_opt(v.cancelled_at),
                v.cancelled_by,
                v.cancel_reason,
                ms(v.created_at),
                ms(v.updated_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(conn: &Connection, visit_id: &str) -> Result<Option<Visit>> {
        conn.query_row(&select_sql("id = ?1"), [visit_id], map_row)
            .optional()
            .map_err(from_rusqlite)
    }

    /// Soonest first
    pub fn list(conn: &Connection, predicate: &Predicate, page: Page) -> Result<Vec<Visit>> {
        let filter = render(predicate);
        let sql = format!(
            "{} ORDER BY scheduled_at, id LIMIT {} OFFSET {}",
            select_sql(&filter.clause),
            page.limit,
            page.offset
        );
        collect(conn, &sql, filter.params())
    }

    /// Non-cancelled visits of an officer that touch `[from, to)`
    ///
    /// Visits without a stored duration are assumed to last
    /// `default_minutes`. The result is a superset filter; exact conflict
    /// rules are applied by the caller.
    pub fn officer_calendar(
        conn: &Connection,
        officer_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        default_minutes: u32,
    ) -> Result<Vec<Visit>> {
        let sql = format!(
            "{} ORDER BY scheduled_at, id",
            select_sql(
                "officer_id = ?1 AND status != 'Cancelled'
                 AND scheduled_at < ?3
                 AND scheduled_at + COALESCE(duration_minutes, ?4) * 60000 > ?2"
            )
        );
        collect(
            conn,
            &sql,
            rusqlite::params![officer_id, ms(from), ms(to), default_minutes],
        )
    }

    /// Scheduled and InProgress visits of a person
    pub fn open_for_person(conn: &Connection, person_id: &str) -> Result<Vec<Visit>> {
        let sql = format!(
            "{} ORDER BY scheduled_at, id",
            select_sql("person_id = ?1 AND status IN ('Scheduled', 'InProgress')")
        );
        collect(conn, &sql, [person_id])
    }

    pub fn has_completed_verification(conn: &Connection, person_id: &str) -> Result<bool> {
        conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM visits
                             WHERE person_id = ?1 AND visit_type = 'Verification'
                               AND status = 'Completed')",
            [person_id],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)
    }

    pub fn mark_started(conn: &Connection, visit_id: &str, now: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "UPDATE visits SET status = 'InProgress', started_at = ?2, updated_at = ?2
             WHERE id = ?1",
            rusqlite::params![visit_id, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn complete(
        conn: &Connection,
        visit_id: &str,
        risk_score: Option<u8>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE visits SET status = 'Completed', risk_score = COALESCE(?2, risk_score),
                               notes = COALESCE(?3, notes), completed_at = ?4, updated_at = ?4
             WHERE id = ?1",
            rusqlite::params![visit_id, risk_score, notes, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn cancel(
        conn: &Connection,
        visit_id: &str,
        reason: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE visits SET status = 'Cancelled', cancel_reason = ?2, cancelled_by = ?3,
                               cancelled_at = ?4, updated_at = ?4
             WHERE id = ?1",
            rusqlite::params![visit_id, reason, actor, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn reschedule(
        conn: &Connection,
        visit_id: &str,
        scheduled_at: DateTime<Utc>,
        duration_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE visits SET scheduled_at = ?2,
                               duration_minutes = COALESCE(?3, duration_minutes),
                               updated_at = ?4
             WHERE id = ?1",
            rusqlite::params![visit_id, ms(scheduled_at), duration_minutes, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }
}
