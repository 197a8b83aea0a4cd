//! Jurisdiction scoping
//!
//! `resolve_scope` turns a caller into a [`DataScope`]; the scope renders
//! to a [`Predicate`] that every entity query is intersected with. The
//! resolver is fail-closed: a restricted caller whose jurisdiction id is
//! missing gets `DataScope::Nothing`, which matches zero rows.

pub mod fields;
pub mod predicate;

use std::collections::BTreeSet;

use beatwatch_core_types::RequestContext;
use serde::{Deserialize, Serialize};

use crate::errors::{BeatwatchError, BwError};
use crate::model::{HierarchyPath, JurisdictionLevel, Officer};

pub use fields::FieldSource;
pub use predicate::{Field, FilterBuilder, Predicate, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Supervisor,
    FieldOfficer,
    Citizen,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match crate::workflow::normalize_state(s).as_str() {
            "ADMIN" | "SUPERADMIN" => Some(Role::Admin),
            "SUPERVISOR" => Some(Role::Supervisor),
            "FIELDOFFICER" | "OFFICER" | "BEATOFFICER" => Some(Role::FieldOfficer),
            "CITIZEN" => Some(Role::Citizen),
            _ => None,
        }
    }
}

/// Everything the engine knows about who is asking
#[derive(Debug, Clone)]
pub struct Caller {
    pub context: RequestContext,
    pub role: Role,
    pub jurisdiction_level: Option<JurisdictionLevel>,
    pub jurisdiction_id: Option<String>,
    pub officer_id: Option<String>,
    pub static_permissions: BTreeSet<String>,
    pub dynamic_permissions: BTreeSet<String>,
}

impl Caller {
    pub fn new(context: RequestContext, role: Role) -> Self {
        Self {
            context,
            role,
            jurisdiction_level: None,
            jurisdiction_id: None,
            officer_id: None,
            static_permissions: BTreeSet::new(),
            dynamic_permissions: BTreeSet::new(),
        }
    }

    /// Unrestricted administrator
    pub fn admin(context: RequestContext) -> Self {
        Self::new(context, Role::Admin).with_jurisdiction(JurisdictionLevel::All, None)
    }

    pub fn with_jurisdiction(mut self, level: JurisdictionLevel, id: Option<String>) -> Self {
        self.jurisdiction_level = Some(level);
        self.jurisdiction_id = id;
        self
    }

    /// Bind the caller to an officer profile, taking the jurisdiction id
    /// from the officer's assignment at `level`
    pub fn with_officer(mut self, level: JurisdictionLevel, officer: &Officer) -> Self {
        self.officer_id = Some(officer.id.clone());
        self.jurisdiction_level = Some(level);
        self.jurisdiction_id = officer.assignment.id_at(level).map(str::to_string);
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.dynamic_permissions.insert(permission.into());
        self
    }

    /// Admins hold every permission; others need it statically or dynamically
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role == Role::Admin
            || self.static_permissions.contains(permission)
            || self.dynamic_permissions.contains(permission)
    }

    /// # Errors
    ///
    /// `BwErrorKind::Forbidden` when the caller lacks `permission`.
    #[allow(clippy::result_large_err)]
    pub fn require(&self, permission: &str) -> Result<(), BwError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(BeatwatchError::Forbidden {
                permission: permission.to_string(),
            }
            .into())
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.context.actor_id
    }
}

/// The subtree of the hierarchy a caller may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataScope {
    All,
    /// Everything tagged with `id` at `level`; `level` is never `All`
    Within { level: JurisdictionLevel, id: String },
    Nothing,
}

impl DataScope {
    /// Whether a record tagged with `path` is visible
    pub fn contains(&self, path: &HierarchyPath) -> bool {
        match self {
            DataScope::All => true,
            DataScope::Within { level, id } => path.id_at(*level) == Some(id.as_str()),
            DataScope::Nothing => false,
        }
    }

    pub fn predicate(&self) -> Predicate {
        match self {
            DataScope::All => Predicate::True,
            DataScope::Within { level, id } => match Field::for_level(*level) {
                Some(field) => Predicate::Eq(field, Value::Text(id.clone())),
                None => Predicate::False,
            },
            DataScope::Nothing => Predicate::False,
        }
    }
}

/// Resolve the caller's scope from their role and jurisdiction fields
pub fn resolve_scope(caller: &Caller) -> DataScope {
    if caller.role == Role::Citizen {
        return DataScope::Nothing;
    }
    match caller.jurisdiction_level {
        None => DataScope::Nothing,
        Some(JurisdictionLevel::All) => DataScope::All,
        Some(level) => match caller.jurisdiction_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => DataScope::Within {
                level,
                id: id.to_string(),
            },
            _ => DataScope::Nothing,
        },
    }
}

/// Direct-object check: reject access to one record outside the scope
///
/// # Errors
///
/// `BwErrorKind::ScopeDenied` when `path` is not inside `scope`.
#[allow(clippy::result_large_err)]
pub fn ensure_in_scope(
    scope: &DataScope,
    entity: &str,
    entity_id: &str,
    path: &HierarchyPath,
) -> Result<(), BwError> {
    if scope.contains(path) {
        Ok(())
    } else {
        Err(BeatwatchError::ScopeDenied {
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BwErrorKind;

    fn caller(level: Option<JurisdictionLevel>, id: Option<&str>) -> Caller {
        let mut c = Caller::new(RequestContext::new("officer-7"), Role::Supervisor);
        c.jurisdiction_level = level;
        c.jurisdiction_id = id.map(str::to_string);
        c
    }

    fn path(station: &str, beat: Option<&str>) -> HierarchyPath {
        HierarchyPath {
            region_id: Some("r-1".into()),
            district_id: Some("d-1".into()),
            sub_area_id: Some("sa-1".into()),
            station_id: Some(station.into()),
            beat_id: beat.map(str::to_string),
        }
    }

    #[test]
    fn test_station_without_id_matches_nothing() {
        let scope = resolve_scope(&caller(Some(JurisdictionLevel::Station), None));
        assert_eq!(scope, DataScope::Nothing);
        assert_eq!(scope.predicate(), Predicate::False);
        assert!(!scope.contains(&path("st-a", None)));
    }

    #[test]
    fn test_blank_id_matches_nothing() {
        let scope = resolve_scope(&caller(Some(JurisdictionLevel::Beat), Some("  ")));
        assert_eq!(scope, DataScope::Nothing);
    }

    #[test]
    fn test_missing_level_and_citizen_match_nothing() {
        assert_eq!(resolve_scope(&caller(None, Some("st-a"))), DataScope::Nothing);

        let mut citizen = caller(Some(JurisdictionLevel::All), None);
        citizen.role = Role::Citizen;
        assert_eq!(resolve_scope(&citizen), DataScope::Nothing);
    }

    #[test]
    fn test_all_level_is_unrestricted() {
        let scope = resolve_scope(&caller(Some(JurisdictionLevel::All), None));
        assert_eq!(scope, DataScope::All);
        assert_eq!(scope.predicate(), Predicate::True);
    }

    #[test]
    fn test_station_scope_predicate() {
        let scope = resolve_scope(&caller(Some(JurisdictionLevel::Station), Some("st-a")));
        assert_eq!(
            scope.predicate(),
            Predicate::Eq(Field::StationId, Value::Text("st-a".into()))
        );
        assert!(scope.contains(&path("st-a", None)));
        assert!(!scope.contains(&path("st-b", None)));
    }

    #[test]
    fn test_ensure_in_scope_denies_outside() {
        let scope = DataScope::Within {
            level: JurisdictionLevel::Beat,
            id: "b-1".into(),
        };
        ensure_in_scope(&scope, "Person", "p-1", &path("st-a", Some("b-1"))).unwrap();
        let err = ensure_in_scope(&scope, "Person", "p-2", &path("st-a", Some("b-2")))
            .unwrap_err();
        assert_eq!(err.kind(), BwErrorKind::ScopeDenied);
        assert_eq!(err.http_status(), 403);
        assert_eq!(err.entity_id(), Some("p-2"));
    }

    #[test]
    fn test_with_officer_takes_id_from_assignment() {
        let officer = Officer {
            id: "o-1".into(),
            name: "Ravi".into(),
            contact: None,
            assignment: path("st-a", None),
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        let c = Caller::new(RequestContext::new("u-1"), Role::FieldOfficer)
            .with_officer(JurisdictionLevel::Beat, &officer);
        assert_eq!(resolve_scope(&c), DataScope::Nothing);

        let c = Caller::new(RequestContext::new("u-1"), Role::FieldOfficer)
            .with_officer(JurisdictionLevel::Station, &officer);
        assert!(matches!(resolve_scope(&c), DataScope::Within { .. }));
    }

    #[test]
    fn test_permissions() {
        let c = caller(None, None)
            .with_permissions(["visit:schedule"])
            .grant("alert:update_status");
        assert!(c.has_permission("visit:schedule"));
        assert!(c.has_permission("alert:update_status"));
        let err = c.require("registration:review").unwrap_err();
        assert_eq!(err.kind(), BwErrorKind::Forbidden);

        let admin = Caller::admin(RequestContext::system());
        assert!(admin.require("registration:review").is_ok());
    }
}
