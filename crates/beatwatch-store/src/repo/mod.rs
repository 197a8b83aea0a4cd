//! Per-table repositories
//!
//! Unit structs with associated functions over `&Connection`; a
//! `Transaction` derefs to `Connection`, so callers choose the
//! transaction boundary.

pub mod alert_repo;
pub mod hierarchy_repo;
pub mod officer_repo;
pub mod outbox_repo;
pub mod person_repo;
pub mod registration_repo;
mod rows;
pub mod verification_repo;
pub mod visit_repo;

pub use alert_repo::AlertRepo;
pub use hierarchy_repo::HierarchyRepo;
pub use officer_repo::OfficerRepo;
pub use outbox_repo::{OutboxCounts, OutboxEntry, OutboxRepo};
pub use person_repo::PersonRepo;
pub use registration_repo::RegistrationRepo;
pub use verification_repo::VerificationRepo;
pub use visit_repo::VisitRepo;

/// Limit/offset window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}
