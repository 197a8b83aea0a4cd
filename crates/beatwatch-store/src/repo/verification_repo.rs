#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, ms_opt, parsed_at, parsed_opt_at, time_at, time_opt_at};
use beatwatch_core::model::{VerificationMethod, VerificationRequest};
use beatwatch_core::workflow::{VerificationRequestStatus, WorkflowState};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

pub struct VerificationRepo;

const SELECT: &str = "SELECT id, person_id, status, officer_id, method, remarks, completed_at,
                             created_at, updated_at
                      FROM verification_requests";

fn map_row(row: &Row<'_>) -> rusqlite::Result<VerificationRequest> {
    Ok(VerificationRequest {
        id: row.get(0)?,
        person_id: row.get(1)?,
        status: parsed_at(row, 2, VerificationRequestStatus::parse)?,
        officer_id: row.get(3)?,
        method: parsed_opt_at(row, 4, VerificationMethod::parse)?,
        remarks: row.get(5)?,
        completed_at: time_opt_at(row, 6)?,
        created_at: time_at(row, 7)?,
        updated_at: time_at(row, 8)?,
    })
}

impl VerificationRepo {
    pub fn insert(conn: &Connection, r: &VerificationRequest) -> Result<()> {
        conn.execute(
            "INSERT INTO verification_requests (id, person_id, status, officer_id, method,
                                                remarks, completed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                r.id,
                r.person_id,
                r.status.as_str(),
                r.officer_id,
                r.method.map(|m| m.as_str()),
                r.remarks,
                ms_opt(r.completed_at),
                ms(r.created_at),
                ms(r.updated_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(conn: &Connection, request_id: &str) -> Result<Option<VerificationRequest>> {
        conn.query_row(&format!("{} WHERE id = ?1", SELECT), [request_id], map_row)
            .optional()
            .map_err(from_rusqlite)
    }

    /// Most recent Pending or InProgress request of a person
    pub fn latest_open_for_person(
        conn: &Connection,
        person_id: &str,
    ) -> Result<Option<VerificationRequest>> {
        conn.query_row(
            &format!(
                "{} WHERE person_id = ?1 AND status IN ('Pending', 'InProgress')
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                SELECT
            ),
            [person_id],
            map_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Write status and, when given, the performing officer, method, remarks
    /// and completion time
    pub fn update(conn: &Connection, r: &VerificationRequest, now: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "UPDATE verification_requests
             SET status = ?2, officer_id = ?3, method = ?4, remarks = ?5, completed_at = ?6,
                 updated_at = ?7
             WHERE id = ?1",
            rusqlite::params![
                r.id,
                r.status.as_str(),
                r.officer_id,
                r.method.map(|m| m.as_str()),
                r.remarks,
                ms_opt(r.completed_at),
                ms(now),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }
}
