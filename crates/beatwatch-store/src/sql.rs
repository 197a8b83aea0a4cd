//! Rendering core predicates to SQLite `WHERE` clauses
//!
//! Values are always bound as parameters. `Predicate::False` renders as
//! `0 = 1`, so a fail-closed scope yields a valid query returning no rows.

use beatwatch_core::scope::{Predicate, Value};
use rusqlite::types::Value as SqlValue;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<SqlValue>,
}

impl SqlFilter {
    pub fn params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, SqlValue>> {
        rusqlite::params_from_iter(self.params.iter())
    }
}

pub fn render(predicate: &Predicate) -> SqlFilter {
    let mut clause = String::new();
    let mut params = Vec::new();
    render_into(predicate, &mut clause, &mut params);
    SqlFilter { clause, params }
}

fn bind(value: &Value) -> SqlValue {
    match value {
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Timestamp(t) => SqlValue::Integer(t.timestamp_millis()),
    }
}

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`
///
/// Only ASCII is lowercased, matching `LOWER()` on the column side.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn join(parts: &[Predicate], op: &str, empty: &str, out: &mut String, params: &mut Vec<SqlValue>) {
    if parts.is_empty() {
        out.push_str(empty);
        return;
    }
    out.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(op);
        }
        render_into(part, out, params);
    }
    out.push(')');
}

fn render_into(predicate: &Predicate, out: &mut String, params: &mut Vec<SqlValue>) {
    match predicate {
        Predicate::True => out.push_str("1 = 1"),
        Predicate::False => out.push_str("0 = 1"),
        Predicate::Eq(field, value) => {
            out.push_str(field.column());
            out.push_str(" = ?");
            params.push(bind(value));
        }
        Predicate::In(_, values) if values.is_empty() => out.push_str("0 = 1"),
        Predicate::In(field, values) => {
            out.push_str(field.column());
            out.push_str(" IN (");
            out.push_str(&vec!["?"; values.len()].join(", "));
            out.push(')');
            params.extend(values.iter().map(bind));
        }
        Predicate::Contains(field, needle) => {
            out.push_str("LOWER(");
            out.push_str(field.column());
            out.push_str(") LIKE ? ESCAPE '\\'");
            params.push(SqlValue::Text(like_pattern(needle)));
        }
        Predicate::Range { field, min, max } => match (min, max) {
            (None, None) => out.push_str("1 = 1"),
            (Some(lo), None) => {
                out.push_str(field.column());
                out.push_str(" >= ?");
                params.push(bind(lo));
            }
            (None, Some(hi)) => {
                out.push_str(field.column());
                out.push_str(" <= ?");
                params.push(bind(hi));
            }
            (Some(lo), Some(hi)) => {
                out.push_str(field.column());
                out.push_str(" BETWEEN ? AND ?");
                params.push(bind(lo));
                params.push(bind(hi));
            }
        },
        Predicate::And(parts) => join(parts, " AND ", "1 = 1", out, params),
        Predicate::Or(parts) => join(parts, " OR ", "0 = 1", out, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatwatch_core::model::JurisdictionLevel;
    use beatwatch_core::scope::{DataScope, Field, FilterBuilder};

    #[test]
    fn test_nothing_scope_renders_false() {
        let f = render(&FilterBuilder::new(&DataScope::Nothing).build());
        assert_eq!(f.clause, "0 = 1");
        assert!(f.params.is_empty());
    }

    #[test]
    fn test_scope_search_and_exact() {
        let scope = DataScope::Within {
            level: JurisdictionLevel::Station,
            id: "st-a".into(),
        };
        let p = FilterBuilder::new(&scope)
            .search("50%_off", &[Field::FullName, Field::Contact])
            .exact(Field::Status, Value::text("Verified"))
            .build();
        let f = render(&p);
        assert_eq!(
            f.clause,
            "(station_id = ? AND (LOWER(full_name) LIKE ? ESCAPE '\\' OR LOWER(contact) LIKE ? ESCAPE '\\') AND status = ?)"
        );
        assert_eq!(f.params.len(), 4);
        assert_eq!(f.params[1], SqlValue::Text("%50\\%\\_off%".into()));
    }

    #[test]
    fn test_in_and_range() {
        let p = Predicate::In(
            Field::Status,
            vec![Value::text("Scheduled"), Value::text("InProgress")],
        )
        .and(Predicate::Range {
            field: Field::ScheduledAt,
            min: Some(Value::Int(10)),
            max: None,
        });
        let f = render(&p);
        assert_eq!(f.clause, "(status IN (?, ?) AND scheduled_at >= ?)");
        assert_eq!(f.params[2], SqlValue::Integer(10));

        assert_eq!(render(&Predicate::In(Field::Id, vec![])).clause, "0 = 1");
    }
}
