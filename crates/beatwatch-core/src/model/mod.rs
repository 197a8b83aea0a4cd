pub mod alert;
pub mod hierarchy;
pub mod officer;
pub mod person;
pub mod registration;
pub mod verification;
pub mod visit;

pub use alert::EmergencyAlert;
pub use hierarchy::{BeatNode, HierarchyPath, JurisdictionLevel, StationNode};
pub use officer::Officer;
pub use person::{Person, VerificationState, VulnerabilityLevel};
pub use registration::Registration;
pub use verification::{VerificationMethod, VerificationRequest};
pub use visit::{NewVisit, Visit, VisitPriority, VisitType};

/// Fresh time-ordered identifier for a new row
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
