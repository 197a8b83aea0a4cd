#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, parsed_at, time_at};
use beatwatch_core::model::Registration;
use beatwatch_core::workflow::{RegistrationStatus, WorkflowState};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

pub struct RegistrationRepo;

const SELECT: &str = "SELECT id, person_id, applicant_name, contact, status, created_at, updated_at
                      FROM registrations";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Registration> {
    Ok(Registration {
        id: row.get(0)?,
        person_id: row.get(1)?,
        applicant_name: row.get(2)?,
        contact: row.get(3)?,
        status: parsed_at(row, 4, RegistrationStatus::parse)?,
        created_at: time_at(row, 5)?,
        updated_at: time_at(row, 6)?,
    })
}

impl RegistrationRepo {
    pub fn insert(conn: &Connection, r: &Registration) -> Result<()> {
        conn.execute(
            "INSERT INTO registrations (id, person_id, applicant_name, contact, status,
                                        created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                r.id,
                r.person_id,
                r.applicant_name,
                r.contact,
                r.status.as_str(),
                ms(r.created_at),
                ms(r.updated_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(conn: &Connection, registration_id: &str) -> Result<Option<Registration>> {
        conn.query_row(&format!("{} WHERE id = ?1", SELECT), [registration_id], map_row)
            .optional()
            .map_err(from_rusqlite)
    }

    pub fn link_person(
        conn: &Connection,
        registration_id: &str,
        person_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE registrations SET person_id = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![registration_id, person_id, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn update_status(
        conn: &Connection,
        registration_id: &str,
        status: RegistrationStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE registrations SET status = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![registration_id, status.as_str(), ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Registrations of a person waiting for review
    pub fn pending_review_for_person(conn: &Connection, person_id: &str) -> Result<Vec<Registration>> {
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE person_id = ?1 AND status = 'PendingReview' ORDER BY created_at, id",
                SELECT
            ))
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([person_id], map_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}
