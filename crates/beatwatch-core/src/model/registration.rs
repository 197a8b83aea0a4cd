use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::RegistrationStatus;

/// Self-service onboarding draft, linked to a person once identity is known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub person_id: Option<String>,
    pub applicant_name: String,
    pub contact: Option<String>,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
