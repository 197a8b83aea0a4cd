//! Composable query predicates
//!
//! Scope, free-text search, exact-match and range filters all become one
//! [`Predicate`] tree. The store renders it to SQL; [`Predicate::matches`]
//! evaluates it in memory against anything implementing [`FieldSource`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::FieldSource;
use super::DataScope;
use crate::model::JurisdictionLevel;

/// Filterable columns shared by the entity tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Id,
    RegionId,
    DistrictId,
    SubAreaId,
    StationId,
    BeatId,
    PersonId,
    OfficerId,
    Status,
    VerificationStatus,
    VisitType,
    VulnerabilityLevel,
    FullName,
    Contact,
    Address,
    ScheduledAt,
    CreatedAt,
    IsActive,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::RegionId => "region_id",
            Field::DistrictId => "district_id",
            Field::SubAreaId => "sub_area_id",
            Field::StationId => "station_id",
            Field::BeatId => "beat_id",
            Field::PersonId => "person_id",
            Field::OfficerId => "officer_id",
            Field::Status => "status",
            Field::VerificationStatus => "verification_status",
            Field::VisitType => "visit_type",
            Field::VulnerabilityLevel => "vulnerability_level",
            Field::FullName => "full_name",
            Field::Contact => "contact",
            Field::Address => "address",
            Field::ScheduledAt => "scheduled_at",
            Field::CreatedAt => "created_at",
            Field::IsActive => "is_active",
        }
    }

    /// Hierarchy column for a jurisdiction level (`None` for `All`)
    pub fn for_level(level: JurisdictionLevel) -> Option<Field> {
        match level {
            JurisdictionLevel::All => None,
            JurisdictionLevel::Region => Some(Field::RegionId),
            JurisdictionLevel::District => Some(Field::DistrictId),
            JurisdictionLevel::SubArea => Some(Field::SubAreaId),
            JurisdictionLevel::Station => Some(Field::StationId),
            JurisdictionLevel::Beat => Some(Field::BeatId),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Ordering between values of the same variant; mixed variants are
    /// incomparable
    fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    True,
    False,
    Eq(Field, Value),
    In(Field, Vec<Value>),
    /// Substring match on a text field, case-insensitive for ASCII letters
    /// only, which is the folding SQLite's `LOWER()` and `LIKE` apply
    Contains(Field, String),
    /// Inclusive bounds; an absent bound is open
    Range {
        field: Field,
        min: Option<Value>,
        max: Option<Value>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction with `True` as identity and `False` absorbing
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), p) => {
                a.push(p);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Disjunction with `False` as identity and `True` absorbing
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::False, p) | (p, Predicate::False) => p,
            (Predicate::Or(mut a), Predicate::Or(b)) => {
                a.extend(b);
                Predicate::Or(a)
            }
            (Predicate::Or(mut a), p) => {
                a.push(p);
                Predicate::Or(a)
            }
            (p, Predicate::Or(mut b)) => {
                b.insert(0, p);
                Predicate::Or(b)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// Whether the predicate can never match
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Predicate::False => true,
            Predicate::In(_, values) => values.is_empty(),
            Predicate::And(parts) => parts.iter().any(Predicate::is_unsatisfiable),
            Predicate::Or(parts) => parts.iter().all(Predicate::is_unsatisfiable),
            _ => false,
        }
    }

    /// Evaluate against an in-memory record; a missing field never matches
    pub fn matches<S: FieldSource + ?Sized>(&self, source: &S) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Eq(field, value) => source.field(*field).as_ref() == Some(value),
            Predicate::In(field, values) => source
                .field(*field)
                .map(|v| values.contains(&v))
                .unwrap_or(false),
            Predicate::Contains(field, needle) => match source.field(*field) {
                Some(Value::Text(hay)) => hay
                    .to_ascii_lowercase()
                    .contains(&needle.to_ascii_lowercase()),
                _ => false,
            },
            Predicate::Range { field, min, max } => match source.field(*field) {
                Some(v) => {
                    let above = min
                        .as_ref()
                        .map(|m| matches!(v.compare(m), Some(Ordering::Greater | Ordering::Equal)))
                        .unwrap_or(true);
                    let below = max
                        .as_ref()
                        .map(|m| matches!(v.compare(m), Some(Ordering::Less | Ordering::Equal)))
                        .unwrap_or(true);
                    above && below
                }
                None => false,
            },
            Predicate::And(parts) => parts.iter().all(|p| p.matches(source)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(source)),
        }
    }
}

/// Builds the final filter for a list query
///
/// The scope is always the outermost conjunct, so no combination of search
/// or exact-match filters can widen it. Exact filters are kept in a sorted
/// map, which makes the rendered predicate independent of call order.
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    scope: Predicate,
    search: Option<(String, Vec<Field>)>,
    exact: BTreeMap<Field, Value>,
    ranges: BTreeMap<Field, (Option<Value>, Option<Value>)>,
}

impl FilterBuilder {
    pub fn new(scope: &DataScope) -> Self {
        Self {
            scope: scope.predicate(),
            search: None,
            exact: BTreeMap::new(),
            ranges: BTreeMap::new(),
        }
    }

    /// Free-text search across `fields`; blank terms are ignored
    pub fn search(mut self, term: &str, fields: &[Field]) -> Self {
        let term = term.trim();
        if !term.is_empty() && !fields.is_empty() {
            self.search = Some((term.to_string(), fields.to_vec()));
        }
        self
    }

    /// Exact-match filter; a later call on the same field replaces the value
    pub fn exact(mut self, field: Field, value: Value) -> Self {
        self.exact.insert(field, value);
        self
    }

    pub fn exact_opt(self, field: Field, value: Option<Value>) -> Self {
        match value {
            Some(v) => self.exact(field, v),
            None => self,
        }
    }

    pub fn between(mut self, field: Field, min: Option<Value>, max: Option<Value>) -> Self {
        if min.is_some() || max.is_some() {
            self.ranges.insert(field, (min, max));
        }
        self
    }

    pub fn build(self) -> Predicate {
        let mut out = self.scope;

        if let Some((term, fields)) = self.search {
            let any = fields
                .into_iter()
                .map(|f| Predicate::Contains(f, term.clone()))
                .fold(Predicate::False, Predicate::or);
            out = out.and(any);
        }

        for (field, value) in self.exact {
            out = out.and(Predicate::Eq(field, value));
        }

        for (field, (min, max)) in self.ranges {
            out = out.and(Predicate::Range { field, min, max });
        }

        out
    }
}
