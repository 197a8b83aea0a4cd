use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{normalize_state, VerificationRequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethod {
    Physical,
    Document,
    Phone,
    BackgroundCheck,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::Physical => "Physical",
            VerificationMethod::Document => "Document",
            VerificationMethod::Phone => "Phone",
            VerificationMethod::BackgroundCheck => "BackgroundCheck",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "PHYSICAL" => Some(VerificationMethod::Physical),
            "DOCUMENT" => Some(VerificationMethod::Document),
            "PHONE" => Some(VerificationMethod::Phone),
            "BACKGROUNDCHECK" => Some(VerificationMethod::BackgroundCheck),
            _ => None,
        }
    }
}

/// Request to verify one person's identity and address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: String,
    pub person_id: String,
    pub status: VerificationRequestStatus,
    pub officer_id: Option<String>,
    pub method: Option<VerificationMethod>,
    pub remarks: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
