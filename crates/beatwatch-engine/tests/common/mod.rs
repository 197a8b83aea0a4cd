// Shared fixtures: two stations with one beat each, one officer per beat,
// one person per station

#![allow(dead_code)]

use beatwatch_core::model::{
    BeatNode, HierarchyPath, JurisdictionLevel, Officer, Person, StationNode,
};
use beatwatch_core::{Caller, Role};
use beatwatch_core_types::RequestContext;
use beatwatch_engine::EngineContext;
use beatwatch_store::db;
use beatwatch_store::repo::{HierarchyRepo, OfficerRepo, PersonRepo};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use tempfile::TempDir;

pub const OFFICER_A_CONTACT: &str = "+15550100";
pub const PERSON_1_CONTACT: &str = "+15550001";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

pub fn ctx() -> EngineContext {
    EngineContext::default().with_fixed_time(t0())
}

pub fn admin() -> Caller {
    Caller::admin(RequestContext::new("admin-1"))
}

pub fn station_caller(station_id: Option<&str>, permissions: &[&str]) -> Caller {
    Caller::new(RequestContext::new("sup-1"), Role::Supervisor)
        .with_jurisdiction(JurisdictionLevel::Station, station_id.map(str::to_string))
        .with_permissions(permissions.iter().copied())
}

pub fn station(id: &str, sub_area: &str) -> StationNode {
    StationNode {
        station_id: id.into(),
        name: format!("Station {}", id),
        sub_area_id: sub_area.into(),
        district_id: "dist-1".into(),
        region_id: "reg-1".into(),
    }
}

pub fn beat(id: &str, station_id: &str) -> BeatNode {
    BeatNode {
        beat_id: id.into(),
        name: format!("Beat {}", id),
        station_id: station_id.into(),
        is_active: true,
    }
}

pub fn officer(id: &str, node: &StationNode, beat: Option<&str>) -> Officer {
    Officer {
        id: id.into(),
        name: format!("Officer {}", id),
        contact: None,
        assignment: HierarchyPath::from_station(node, beat.map(String::from)),
        is_active: true,
        created_at: t0(),
    }
}

/// st-a/beat-a1 with off-a and p-1; st-b/beat-b1 with off-b and p-2
pub fn setup() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let conn = db::open_migrated(dir.path().join("beatwatch.db")).unwrap();

    let a = station("st-a", "sub-a");
    let b = station("st-b", "sub-b");
    HierarchyRepo::insert_station(&conn, &a).unwrap();
    HierarchyRepo::insert_station(&conn, &b).unwrap();
    HierarchyRepo::insert_beat(&conn, &beat("beat-a1", "st-a")).unwrap();
    HierarchyRepo::insert_beat(&conn, &beat("beat-b1", "st-b")).unwrap();

    let mut off_a = officer("off-a", &a, Some("beat-a1"));
    off_a.contact = Some(OFFICER_A_CONTACT.into());
    OfficerRepo::insert(&conn, &off_a).unwrap();
    OfficerRepo::insert(&conn, &officer("off-b", &b, Some("beat-b1"))).unwrap();

    let mut p1 = Person::new(
        "p-1",
        "Asha Rao",
        "12 Lake Road",
        HierarchyPath::from_station(&a, Some("beat-a1".into())),
        t0(),
    )
    .with_contact(PERSON_1_CONTACT);
    p1.assigned_officer_id = Some("off-a".into());
    let mut p2 = Person::new(
        "p-2",
        "Ben Okafor",
        "4 Hill Street",
        HierarchyPath::from_station(&b, Some("beat-b1".into())),
        t0(),
    );
    p2.assigned_officer_id = Some("off-b".into());
    PersonRepo::insert(&conn, &p1).unwrap();
    PersonRepo::insert(&conn, &p2).unwrap();

    (dir, conn)
}
