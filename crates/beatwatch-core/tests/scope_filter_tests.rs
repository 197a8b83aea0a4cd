#![allow(clippy::unwrap_used, clippy::expect_used)]

use beatwatch_core::model::{HierarchyPath, JurisdictionLevel, Person};
use beatwatch_core::scope::{
    ensure_in_scope, resolve_scope, Caller, DataScope, Field, FilterBuilder, Role, Value,
};
use beatwatch_core::BwErrorKind;
use beatwatch_core_types::RequestContext;
use chrono::Utc;
use proptest::prelude::*;

fn person(id: &str, station: &str, beat: &str) -> Person {
    let path = HierarchyPath {
        region_id: Some("r-1".into()),
        district_id: Some("d-1".into()),
        sub_area_id: Some("sa-1".into()),
        station_id: Some(station.into()),
        beat_id: Some(beat.into()),
    };
    Person::new(id, format!("Person {}", id), "addr", path, Utc::now())
}

fn roster() -> Vec<Person> {
    vec![
        person("p-1", "st-a", "b-1"),
        person("p-2", "st-a", "b-2"),
        person("p-3", "st-b", "b-3"),
    ]
}

fn visible(scope: &DataScope) -> Vec<String> {
    let predicate = FilterBuilder::new(scope).build();
    roster()
        .into_iter()
        .filter(|p| predicate.matches(p))
        .map(|p| p.id)
        .collect()
}

#[test]
fn test_station_caller_sees_station_only() {
    let caller = Caller::new(RequestContext::new("u-1"), Role::Supervisor)
        .with_jurisdiction(JurisdictionLevel::Station, Some("st-a".into()));
    assert_eq!(visible(&resolve_scope(&caller)), vec!["p-1", "p-2"]);
}

#[test]
fn test_unlinked_station_caller_sees_nothing() {
    let caller = Caller::new(RequestContext::new("u-2"), Role::Supervisor)
        .with_jurisdiction(JurisdictionLevel::Station, None);
    assert!(visible(&resolve_scope(&caller)).is_empty());
}

#[test]
fn test_admin_sees_everything() {
    let caller = Caller::admin(RequestContext::new("root"));
    assert_eq!(visible(&resolve_scope(&caller)).len(), 3);
}

#[test]
fn test_direct_access_outside_scope_is_403() {
    let caller = Caller::new(RequestContext::new("u-3"), Role::FieldOfficer)
        .with_jurisdiction(JurisdictionLevel::Beat, Some("b-1".into()));
    let scope = resolve_scope(&caller);
    let target = person("p-3", "st-b", "b-3");
    let err = ensure_in_scope(&scope, "Person", &target.id, &target.location).unwrap_err();
    assert_eq!(err.kind(), BwErrorKind::ScopeDenied);
    assert_eq!(err.http_status(), 403);
}

#[test]
fn test_search_and_exact_filters_merge_with_scope() {
    let scope = DataScope::Within {
        level: JurisdictionLevel::Station,
        id: "st-a".into(),
    };
    let predicate = FilterBuilder::new(&scope)
        .search("person p-", &[Field::FullName])
        .exact(Field::BeatId, Value::text("b-2"))
        .build();
    let hits: Vec<_> = roster().into_iter().filter(|p| predicate.matches(p)).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "p-2");
}

proptest! {
    /// A restricted level with no id never resolves to anything but Nothing
    #[test]
    fn prop_restricted_level_without_id_is_nothing(level in 1usize..6, blank in "[ \t]{0,3}") {
        let levels = [
            JurisdictionLevel::All,
            JurisdictionLevel::Region,
            JurisdictionLevel::District,
            JurisdictionLevel::SubArea,
            JurisdictionLevel::Station,
            JurisdictionLevel::Beat,
        ];
        let id = if blank.is_empty() { None } else { Some(blank) };
        let caller = Caller::new(RequestContext::new("u"), Role::Supervisor)
            .with_jurisdiction(levels[level], id);
        let scope = resolve_scope(&caller);
        prop_assert_eq!(&scope, &DataScope::Nothing);
        prop_assert!(visible(&scope).is_empty());
    }
}
