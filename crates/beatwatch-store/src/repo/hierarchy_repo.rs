#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use beatwatch_core::model::{BeatNode, StationNode};
use rusqlite::{Connection, OptionalExtension};

pub struct HierarchyRepo;

impl HierarchyRepo {
    pub fn insert_station(conn: &Connection, node: &StationNode) -> Result<()> {
        conn.execute(
            "INSERT INTO stations (id, name, sub_area_id, district_id, region_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                node.station_id,
                node.name,
                node.sub_area_id,
                node.district_id,
                node.region_id
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get_station(conn: &Connection, station_id: &str) -> Result<Option<StationNode>> {
        conn.query_row(
            "SELECT id, name, sub_area_id, district_id, region_id FROM stations WHERE id = ?1",
            [station_id],
            |row| {
                Ok(StationNode {
                    station_id: row.get(0)?,
                    name: row.get(1)?,
                    sub_area_id: row.get(2)?,
                    district_id: row.get(3)?,
                    region_id: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(from_rusqlite)
    }

    pub fn insert_beat(conn: &Connection, beat: &BeatNode) -> Result<()> {
        conn.execute(
            "INSERT INTO beats (id, name, station_id, is_active) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![beat.beat_id, beat.name, beat.station_id, beat.is_active],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get_beat(conn: &Connection, beat_id: &str) -> Result<Option<BeatNode>> {
        conn.query_row(
            "SELECT id, name, station_id, is_active FROM beats WHERE id = ?1",
            [beat_id],
            |row| {
                Ok(BeatNode {
                    beat_id: row.get(0)?,
                    name: row.get(1)?,
                    station_id: row.get(2)?,
                    is_active: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(from_rusqlite)
    }
}
