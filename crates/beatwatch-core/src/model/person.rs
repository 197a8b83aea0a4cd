use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hierarchy::HierarchyPath;
use crate::workflow::{normalize_state, PersonStatus};

/// Identity verification outcome recorded on the person
///
/// Not a workflow of its own: it follows the verification request and the
/// address-change cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationState {
    Pending,
    Verified,
    Rejected,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Pending => "Pending",
            VerificationState::Verified => "Verified",
            VerificationState::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "PENDING" => Some(VerificationState::Pending),
            "VERIFIED" | "APPROVED" => Some(VerificationState::Verified),
            "REJECTED" => Some(VerificationState::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VulnerabilityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl VulnerabilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityLevel::Low => "Low",
            VulnerabilityLevel::Medium => "Medium",
            VulnerabilityLevel::High => "High",
            VulnerabilityLevel::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "LOW" => Some(VulnerabilityLevel::Low),
            "MEDIUM" => Some(VulnerabilityLevel::Medium),
            "HIGH" => Some(VulnerabilityLevel::High),
            "CRITICAL" => Some(VulnerabilityLevel::Critical),
            _ => None,
        }
    }

    /// Level implied by a visit risk score (0-100)
    ///
    /// 71 and above is Critical, 51-70 High, 31-50 Medium, the rest Low.
    pub fn from_risk_score(score: u8) -> Self {
        match score {
            71..=u8::MAX => VulnerabilityLevel::Critical,
            51..=70 => VulnerabilityLevel::High,
            31..=50 => VulnerabilityLevel::Medium,
            _ => VulnerabilityLevel::Low,
        }
    }
}

/// A person under watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub full_name: String,
    pub contact: Option<String>,
    pub address: String,
    pub location: HierarchyPath,
    pub status: PersonStatus,
    pub verification_status: VerificationState,
    pub vulnerability: VulnerabilityLevel,
    pub credential_number: Option<String>,
    pub credential_issued_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub assigned_officer_id: Option<String>,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    /// A freshly entered person: Pending, unverified, low vulnerability
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        address: impl Into<String>,
        location: HierarchyPath,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            contact: None,
            address: address.into(),
            location,
            status: PersonStatus::Pending,
            verification_status: VerificationState::Pending,
            vulnerability: VulnerabilityLevel::Low,
            credential_number: None,
            credential_issued_at: None,
            remarks: None,
            assigned_officer_id: None,
            last_visit_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }
}
