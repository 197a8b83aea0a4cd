use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hierarchy::HierarchyPath;
use crate::workflow::AlertStatus;

/// An SOS raised by or for a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: String,
    pub person_id: String,
    pub location: HierarchyPath,
    pub status: AlertStatus,
    pub notes: Option<String>,
    pub responded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}
