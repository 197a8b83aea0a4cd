//! In-memory field access for predicate evaluation

use super::predicate::{Field, Value};
use crate::model::{EmergencyAlert, HierarchyPath, Officer, Person, Visit};
use crate::workflow::WorkflowState;

/// A record whose fields a [`super::Predicate`] can inspect
pub trait FieldSource {
    fn field(&self, field: Field) -> Option<Value>;
}

fn hierarchy_field(path: &HierarchyPath, field: Field) -> Option<Value> {
    let id = match field {
        Field::RegionId => path.region_id.as_ref(),
        Field::DistrictId => path.district_id.as_ref(),
        Field::SubAreaId => path.sub_area_id.as_ref(),
        Field::StationId => path.station_id.as_ref(),
        Field::BeatId => path.beat_id.as_ref(),
        _ => None,
    };
    id.map(|s| Value::Text(s.clone()))
}

impl FieldSource for Person {
    fn field(&self, field: Field) -> Option<Value> {
        match field {
            Field::Id => Some(Value::text(&self.id)),
            Field::Status => Some(Value::text(self.status.as_str())),
            Field::VerificationStatus => Some(Value::text(self.verification_status.as_str())),
            Field::VulnerabilityLevel => Some(Value::text(self.vulnerability.as_str())),
            Field::FullName => Some(Value::text(&self.full_name)),
            Field::Contact => self.contact.as_ref().map(Value::text),
            Field::Address => Some(Value::text(&self.address)),
            Field::OfficerId => self.assigned_officer_id.as_ref().map(Value::text),
            Field::CreatedAt => Some(Value::Timestamp(self.created_at)),
            Field::IsActive => Some(Value::Bool(self.is_active)),
            _ => hierarchy_field(&self.location, field),
        }
    }
}

impl FieldSource for Visit {
    fn field(&self, field: Field) -> Option<Value> {
        match field {
            Field::Id => Some(Value::text(&self.id)),
            Field::PersonId => Some(Value::text(&self.person_id)),
            Field::OfficerId => Some(Value::text(&self.officer_id)),
            Field::Status => Some(Value::text(self.status.as_str())),
            Field::VisitType => Some(Value::text(self.visit_type.as_str())),
            Field::ScheduledAt => Some(Value::Timestamp(self.scheduled_at)),
            Field::CreatedAt => Some(Value::Timestamp(self.created_at)),
            _ => hierarchy_field(&self.location, field),
        }
    }
}

impl FieldSource for Officer {
    fn field(&self, field: Field) -> Option<Value> {
        match field {
            Field::Id | Field::OfficerId => Some(Value::text(&self.id)),
            Field::FullName => Some(Value::text(&self.name)),
            Field::Contact => self.contact.as_ref().map(Value::text),
            Field::IsActive => Some(Value::Bool(self.is_active)),
            Field::CreatedAt => Some(Value::Timestamp(self.created_at)),
            _ => hierarchy_field(&self.assignment, field),
        }
    }
}

impl FieldSource for EmergencyAlert {
    fn field(&self, field: Field) -> Option<Value> {
        match field {
            Field::Id => Some(Value::text(&self.id)),
            Field::PersonId => Some(Value::text(&self.person_id)),
            Field::Status => Some(Value::text(self.status.as_str())),
            Field::CreatedAt => Some(Value::Timestamp(self.created_at)),
            _ => hierarchy_field(&self.location, field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{DataScope, FilterBuilder};
    use crate::model::JurisdictionLevel;
    use chrono::Utc;

    #[test]
    fn test_person_scope_and_search() {
        let path = HierarchyPath {
            station_id: Some("st-a".into()),
            beat_id: Some("b-1".into()),
            ..HierarchyPath::default()
        };
        let person = Person::new("p-1", "Kamala Devi", "4 Hill Rd", path, Utc::now())
            .with_contact("9000000001");

        let scope = DataScope::Within {
            level: JurisdictionLevel::Beat,
            id: "b-1".into(),
        };
        let p = FilterBuilder::new(&scope)
            .search("kamala", &[Field::FullName, Field::Contact])
            .build();
        assert!(p.matches(&person));

        let other_beat = DataScope::Within {
            level: JurisdictionLevel::Beat,
            id: "b-2".into(),
        };
        assert!(!FilterBuilder::new(&other_beat).build().matches(&person));
    }

    #[test]
    fn test_missing_hierarchy_field_never_matches() {
        let person = Person::new("p-1", "X", "Y", HierarchyPath::new(), Utc::now());
        let scope = DataScope::Within {
            level: JurisdictionLevel::District,
            id: "d-1".into(),
        };
        assert!(!scope.predicate().matches(&person));
    }
}
