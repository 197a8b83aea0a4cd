use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hierarchy::HierarchyPath;

/// A field officer
///
/// `assignment` tags the officer at every level they are bound to; an
/// officer attached to a beat carries its station, sub-area, district and
/// region as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Officer {
    pub id: String,
    pub name: String,
    pub contact: Option<String>,
    pub assignment: HierarchyPath,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
