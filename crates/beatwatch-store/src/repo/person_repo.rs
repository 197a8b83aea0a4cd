#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, ms_opt, parsed_at, path_at, time_at, time_opt_at, PATH_COLUMNS};
use crate::repo::Page;
use crate::sql::render;
use beatwatch_core::model::{HierarchyPath, Person, VerificationState, VulnerabilityLevel};
use beatwatch_core::scope::Predicate;
use beatwatch_core::workflow::{PersonStatus, WorkflowState};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

pub struct PersonRepo;

fn select_sql(where_clause: &str) -> String {
    format!(
        "SELECT id, full_name, contact, address, {}, status, verification_status,
                vulnerability_level, credential_number, credential_issued_at, remarks,
                assigned_officer_id, last_visit_at, is_active, created_at, updated_at
         FROM persons WHERE {}",
        PATH_COLUMNS, where_clause
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        full_name: row.get(1)?,
        contact: row.get(2)?,
        address: row.get(3)?,
        location: path_at(row, 4)?,
        status: parsed_at(row, 9, PersonStatus::parse)?,
        verification_status: parsed_at(row, 10, VerificationState::parse)?,
        vulnerability: parsed_at(row, 11, VulnerabilityLevel::parse)?,
        credential_number: row.get(12)?,
        credential_issued_at: time_opt_at(row, 13)?,
        remarks: row.get(14)?,
        assigned_officer_id: row.get(15)?,
        last_visit_at: time_opt_at(row, 16)?,
        is_active: row.get(17)?,
        created_at: time_at(row, 18)?,
        updated_at: time_at(row, 19)?,
    })
}

impl PersonRepo {
    pub fn insert(conn: &Connection, p: &Person) -> Result<()> {
        let loc = &p.location;
        conn.execute(
            "INSERT INTO persons (id, full_name, contact, address, region_id, district_id,
                                  sub_area_id, station_id, beat_id, status, verification_status,
                                  vulnerability_level, credential_number, credential_issued_at,
                                  remarks, assigned_officer_id, last_visit_at, is_active,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20)",
            rusqlite::params![
                p.id,
                p.full_name,
                p.contact,
                p.address,
                loc.region_id,
                loc.district_id,
                loc.sub_area_id,
                loc.station_id,
                loc.beat_id,
                p.status.as_str(),
                p.verification_status.as_str(),
                p.vulnerability.as_str(),
                p.credential_number,
                ms_opt(p.credential_issued_at),
                p.remarks,
                p.assigned_officer_id,
                ms_opt(p.last_visit_at),
                p.is_active,
                ms(p.created_at),
                ms(p.updated_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(conn: &Connection, person_id: &str) -> Result<Option<Person>> {
        conn.query_row(&select_sql("id = ?1"), [person_id], map_row)
            .optional()
            .map_err(from_rusqlite)
    }

    /// Newest first
    pub fn list(conn: &Connection, predicate: &Predicate, page: Page) -> Result<Vec<Person>> {
        let filter = render(predicate);
        let sql = format!(
            "{} ORDER BY created_at DESC, id LIMIT {} OFFSET {}",
            select_sql(&filter.clause),
            page.limit,
            page.offset
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(filter.params(), map_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    pub fn count(conn: &Connection, predicate: &Predicate) -> Result<u64> {
        let filter = render(predicate);
        let sql = format!("SELECT COUNT(*) FROM persons WHERE {}", filter.clause);
        let n: i64 = conn
            .query_row(&sql, filter.params(), |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Also keeps `is_active` in step with the lifecycle status
    pub fn update_status(
        conn: &Connection,
        person_id: &str,
        status: PersonStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE persons SET status = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?1",
            rusqlite::params![person_id, status.as_str(), status.is_active(), ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn set_verification(
        conn: &Connection,
        person_id: &str,
        state: VerificationState,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE persons SET verification_status = ?2, remarks = COALESCE(?3, remarks),
                                updated_at = ?4
             WHERE id = ?1",
            rusqlite::params![person_id, state.as_str(), remarks, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn relocate(
        conn: &Connection,
        person_id: &str,
        path: &HierarchyPath,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE persons SET region_id = ?2, district_id = ?3, sub_area_id = ?4,
                                station_id = ?5, beat_id = ?6, address = ?7, updated_at = ?8
             WHERE id = ?1",
            rusqlite::params![
                person_id,
                path.region_id,
                path.district_id,
                path.sub_area_id,
                path.station_id,
                path.beat_id,
                address,
                ms(now),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn set_assigned_officer(
        conn: &Connection,
        person_id: &str,
        officer_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE persons SET assigned_officer_id = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![person_id, officer_id, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Store a credential unless one is already present; returns whether
    /// the row was written
    pub fn issue_credential(
        conn: &Connection,
        person_id: &str,
        number: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let n = conn
            .execute(
                "UPDATE persons SET credential_number = ?2, credential_issued_at = ?3,
                                    updated_at = ?3
                 WHERE id = ?1 AND credential_number IS NULL",
                rusqlite::params![person_id, number, ms(now)],
            )
            .map_err(from_rusqlite)?;
        Ok(n > 0)
    }

    pub fn record_visit_outcome(
        conn: &Connection,
        person_id: &str,
        vulnerability: Option<VulnerabilityLevel>,
        visited_at: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE persons SET vulnerability_level = COALESCE(?2, vulnerability_level),
                                last_visit_at = ?3, updated_at = ?3
             WHERE id = ?1",
            rusqlite::params![person_id, vulnerability.map(|v| v.as_str()), ms(visited_at)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Active verified people whose last visit, or registration when never
    /// visited, is before `cutoff`
    pub fn verified_not_visited_since(
        conn: &Connection,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Person>> {
        let sql = format!(
            "{} ORDER BY created_at, id",
            select_sql(
                "is_active = 1 AND verification_status = 'Verified' \
                 AND COALESCE(last_visit_at, created_at) < ?1"
            )
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([ms(cutoff)], map_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    /// Active people whose verification is still Pending
    pub fn pending_verification(conn: &Connection) -> Result<Vec<Person>> {
        let sql = format!(
            "{} ORDER BY created_at, id",
            select_sql("is_active = 1 AND verification_status = 'Pending'")
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], map_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}
