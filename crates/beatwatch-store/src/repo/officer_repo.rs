#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, path_at, time_at, PATH_COLUMNS};
use crate::sql::render;
use beatwatch_core::assignment::OfficerLoad;
use beatwatch_core::model::Officer;
use beatwatch_core::scope::Predicate;
use rusqlite::{Connection, OptionalExtension, Row};

pub struct OfficerRepo;

fn select_sql(where_clause: &str) -> String {
    format!(
        "SELECT id, full_name, contact, {}, is_active, created_at FROM officers WHERE {}",
        PATH_COLUMNS, where_clause
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Officer> {
    Ok(Officer {
        id: row.get(0)?,
        name: row.get(1)?,
        contact: row.get(2)?,
        assignment: path_at(row, 3)?,
        is_active: row.get(8)?,
        created_at: time_at(row, 9)?,
    })
}

/// Open-visit count per active officer matching `filter_column = ?1`,
/// smallest load first, ties by officer id
const WORKLOAD_SQL: &str = "SELECT o.id, COUNT(v.id) AS open_visits
     FROM officers o
     LEFT JOIN visits v
       ON v.officer_id = o.id AND v.status IN ('Scheduled', 'InProgress')
     WHERE o.is_active = 1 AND o.{col} = ?1
     GROUP BY o.id
     ORDER BY open_visits ASC, o.id ASC";

impl OfficerRepo {
    pub fn insert(conn: &Connection, officer: &Officer) -> Result<()> {
        let p = &officer.assignment;
        conn.execute(
            "INSERT INTO officers (id, full_name, contact, region_id, district_id, sub_area_id,
                                   station_id, beat_id, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                officer.id,
                officer.name,
                officer.contact,
                p.region_id,
                p.district_id,
                p.sub_area_id,
                p.station_id,
                p.beat_id,
                officer.is_active,
                ms(officer.created_at),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(conn: &Connection, officer_id: &str) -> Result<Option<Officer>> {
        conn.query_row(&select_sql("id = ?1"), [officer_id], map_row)
            .optional()
            .map_err(from_rusqlite)
    }

    pub fn list(conn: &Connection, predicate: &Predicate) -> Result<Vec<Officer>> {
        let filter = render(predicate);
        let sql = format!("{} ORDER BY id", select_sql(&filter.clause));
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(filter.params(), map_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    pub fn set_active(conn: &Connection, officer_id: &str, is_active: bool) -> Result<bool> {
        let n = conn
            .execute(
                "UPDATE officers SET is_active = ?2 WHERE id = ?1",
                rusqlite::params![officer_id, is_active],
            )
            .map_err(from_rusqlite)?;
        Ok(n > 0)
    }

    /// Workload of the active officers bound to a beat
    pub fn workload_in_beat(conn: &Connection, beat_id: &str) -> Result<Vec<OfficerLoad>> {
        Self::workload(conn, "beat_id", beat_id)
    }

    /// Workload of the active officers bound to a station
    pub fn workload_in_station(conn: &Connection, station_id: &str) -> Result<Vec<OfficerLoad>> {
        Self::workload(conn, "station_id", station_id)
    }

    fn workload(conn: &Connection, column: &str, id: &str) -> Result<Vec<OfficerLoad>> {
        let sql = WORKLOAD_SQL.replace("{col}", column);
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([id], |row| {
                let open: i64 = row.get(1)?;
                Ok(OfficerLoad::new(
                    row.get::<_, String>(0)?,
                    u32::try_from(open).unwrap_or(u32::MAX),
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}
