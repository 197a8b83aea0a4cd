//! Workload-balanced officer selection

use serde::{Deserialize, Serialize};

/// An officer together with the number of open visits on their calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerLoad {
    pub officer_id: String,
    /// Scheduled plus InProgress visits
    pub open_visits: u32,
}

impl OfficerLoad {
    pub fn new(officer_id: impl Into<String>, open_visits: u32) -> Self {
        Self {
            officer_id: officer_id.into(),
            open_visits,
        }
    }
}

/// Which candidate pool produced the assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidatePool {
    Beat,
    Station,
}

/// Pick the least-loaded candidate; ties go to the smallest officer id
///
/// Returns `None` for an empty pool. Input order does not matter.
pub fn select_least_loaded(candidates: &[OfficerLoad]) -> Option<&OfficerLoad> {
    candidates
        .iter()
        .min_by(|a, b| {
            a.open_visits
                .cmp(&b.open_visits)
                .then_with(|| a.officer_id.cmp(&b.officer_id))
        })
}
