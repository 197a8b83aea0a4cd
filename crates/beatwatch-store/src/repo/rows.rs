//! Column conversions shared by the repositories

use beatwatch_core::model::HierarchyPath;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub fn ms(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub fn ms_opt(t: Option<DateTime<Utc>>) -> Option<i64> {
    t.map(ms)
}

fn conversion_error(idx: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
}

pub fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: i64 = row.get(idx)?;
    Utc.timestamp_millis_opt(raw)
        .single()
        .ok_or_else(|| conversion_error(idx, Type::Integer, format!("timestamp out of range: {}", raw)))
}

pub fn time_opt_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|ms| {
        Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
            conversion_error(idx, Type::Integer, format!("timestamp out of range: {}", ms))
        })
    })
    .transpose()
}

/// Read a text column through a `parse` function (status enums and the like)
pub fn parsed_at<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, Type::Text, format!("unrecognised value '{}'", raw)))
}

pub fn parsed_opt_at<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse(&s).ok_or_else(|| conversion_error(idx, Type::Text, format!("unrecognised value '{}'", s)))
    })
    .transpose()
}

/// Five consecutive hierarchy columns starting at `start`
/// (region, district, sub-area, station, beat)
pub fn path_at(row: &Row<'_>, start: usize) -> rusqlite::Result<HierarchyPath> {
    Ok(HierarchyPath {
        region_id: row.get(start)?,
        district_id: row.get(start + 1)?,
        sub_area_id: row.get(start + 2)?,
        station_id: row.get(start + 3)?,
        beat_id: row.get(start + 4)?,
    })
}

pub const PATH_COLUMNS: &str = "region_id, district_id, sub_area_id, station_id, beat_id";
