//! Cross-entity preconditions attached to transition edges

use crate::errors::BwError;

/// A precondition an edge needs beyond being in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// A person must be linked and must have a `Completed` visit of type
    /// `Verification`
    CompletedVerificationVisit,
}

impl Guard {
    /// Human-readable statement of what the guard requires
    pub fn describe(&self) -> &'static str {
        match self {
            Guard::CompletedVerificationVisit => {
                "a linked person with a Completed Verification visit is required"
            }
        }
    }
}

/// Evidence source consulted when a guarded edge is validated
///
/// Implemented over a database connection by the store; the validator
/// itself never performs I/O.
#[allow(clippy::result_large_err)]
pub trait GuardContext {
    /// Whether `person_id` has at least one `Completed` Verification visit
    ///
    /// # Errors
    ///
    /// Returns `BwErrorKind::Persistence` if the evidence cannot be read.
    fn has_completed_verification_visit(&self, person_id: &str) -> Result<bool, BwError>;
}

/// Context with no evidence at all: every guard fails
pub struct NoEvidence;

impl GuardContext for NoEvidence {
    fn has_completed_verification_visit(&self, _person_id: &str) -> Result<bool, BwError> {
        Ok(false)
    }
}
