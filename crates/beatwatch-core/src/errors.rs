use beatwatch_core_types::RequestId;
use thiserror::Error;

use crate::workflow::EntityKind;

/// Result type alias using BeatwatchError
pub type Result<T> = std::result::Result<T, BeatwatchError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by the store and engine layers is classified into
/// exactly one kind. Kinds carry a stable code for programmatic handling and
/// an HTTP status for the controller layer that sits outside this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BwErrorKind {
    // Request shape
    InvalidInput,
    NotFound,
    UnknownState,

    // Access
    /// Entity lies outside the caller's jurisdiction (direct-object access)
    ScopeDenied,
    /// Caller lacks the permission the operation requires
    Forbidden,

    // Workflow
    /// `from → to` is not an edge of the transition table
    InvalidTransition,
    /// Edge exists but its cross-entity precondition failed
    GuardUnmet,
    SchedulingConflict,
    AssignmentUnavailable,
    DuplicateActiveAlert,

    // Storage
    ConstraintViolation,
    Persistence,
    Serialization,
    Io,

    // Setup
    Config,

    Internal,
}

impl BwErrorKind {
    /// Stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            BwErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            BwErrorKind::NotFound => "ERR_NOT_FOUND",
            BwErrorKind::UnknownState => "ERR_UNKNOWN_STATE",
            BwErrorKind::ScopeDenied => "ERR_SCOPE_DENIED",
            BwErrorKind::Forbidden => "ERR_FORBIDDEN",
            BwErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            BwErrorKind::GuardUnmet => "ERR_GUARD_UNMET",
            BwErrorKind::SchedulingConflict => "ERR_SCHEDULING_CONFLICT",
            BwErrorKind::AssignmentUnavailable => "ERR_ASSIGNMENT_UNAVAILABLE",
            BwErrorKind::DuplicateActiveAlert => "ERR_DUPLICATE_ACTIVE_ALERT",
            BwErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            BwErrorKind::Persistence => "ERR_PERSISTENCE",
            BwErrorKind::Serialization => "ERR_SERIALIZATION",
            BwErrorKind::Io => "ERR_IO",
            BwErrorKind::Config => "ERR_CONFIG",
            BwErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// HTTP status the controller layer should answer with
    ///
    /// Domain failures are recoverable by the caller and map to 4xx; only
    /// storage, transport and internal failures are 5xx.
    pub fn http_status(&self) -> u16 {
        match self {
            BwErrorKind::InvalidInput
            | BwErrorKind::UnknownState
            | BwErrorKind::InvalidTransition
            | BwErrorKind::GuardUnmet => 400,
            BwErrorKind::ScopeDenied | BwErrorKind::Forbidden => 403,
            BwErrorKind::NotFound => 404,
            BwErrorKind::SchedulingConflict
            | BwErrorKind::DuplicateActiveAlert
            | BwErrorKind::ConstraintViolation => 409,
            BwErrorKind::AssignmentUnavailable => 422,
            BwErrorKind::Persistence
            | BwErrorKind::Serialization
            | BwErrorKind::Io
            | BwErrorKind::Config
            | BwErrorKind::Internal => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus free-form context
/// for operators. `details` carries structured lists such as the legal next
/// states of a rejected transition or the ids of conflicting visits.
#[derive(Debug, Clone)]
pub struct BwError {
    kind: BwErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    details: Vec<String>,
}

impl BwError {
    pub fn new(kind: BwErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            message: String::new(),
            details: Vec::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the id of the entity the operation targeted
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach structured detail items (allowed states, conflicting ids, ...)
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn kind(&self) -> BwErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }
}

impl std::fmt::Display for BwError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for BwError {}

// ========== End Error Facility ==========

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Domain error taxonomy for the pure core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BeatwatchError {
    // ===== Lookup =====
    #[error("Person not found: {person_id}")]
    PersonNotFound { person_id: String },

    #[error("Officer not found: {officer_id}")]
    OfficerNotFound { officer_id: String },

    #[error("Visit not found: {visit_id}")]
    VisitNotFound { visit_id: String },

    #[error("Emergency alert not found: {alert_id}")]
    AlertNotFound { alert_id: String },

    #[error("Verification request not found: {request_id}")]
    VerificationRequestNotFound { request_id: String },

    #[error("Registration not found: {registration_id}")]
    RegistrationNotFound { registration_id: String },

    #[error("Station not found: {station_id}")]
    StationNotFound { station_id: String },

    // ===== Workflow =====
    /// Status string does not name any state of the entity kind
    #[error("Unknown {kind} state: {state}")]
    UnknownState { kind: EntityKind, state: String },

    #[error("Invalid {kind} transition from {from} to {to}. Allowed: {}", join_or_none(.allowed))]
    InvalidTransition {
        kind: EntityKind,
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    #[error("{kind} transition from {from} to {to} blocked: {precondition}")]
    GuardUnmet {
        kind: EntityKind,
        from: String,
        to: String,
        precondition: String,
    },

    // ===== Access =====
    #[error("{entity} {entity_id} is outside the caller's jurisdiction")]
    ScopeDenied { entity: String, entity_id: String },

    #[error("Missing permission: {permission}")]
    Forbidden { permission: String },

    // ===== Scheduling =====
    #[error("Officer {officer_id} has {} conflicting visit(s): {}", .visit_ids.len(), .visit_ids.join(", "))]
    SchedulingConflict {
        officer_id: String,
        visit_ids: Vec<String>,
    },

    #[error("No officer available for person {person_id}")]
    AssignmentUnavailable { person_id: String },

    #[error("Person {person_id} already has an active emergency alert: {alert_id}")]
    DuplicateActiveAlert { person_id: String, alert_id: String },

    // ===== Input / setup =====
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<BeatwatchError> for BwError {
    fn from(err: BeatwatchError) -> Self {
        let message = err.to_string();
        match err {
            BeatwatchError::PersonNotFound { person_id } => BwError::new(BwErrorKind::NotFound)
                .with_entity_id(person_id)
                .with_message(message),
            BeatwatchError::OfficerNotFound { officer_id } => BwError::new(BwErrorKind::NotFound)
                .with_entity_id(officer_id)
                .with_message(message),
            BeatwatchError::VisitNotFound { visit_id } => BwError::new(BwErrorKind::NotFound)
                .with_entity_id(visit_id)
                .with_message(message),
            BeatwatchError::AlertNotFound { alert_id } => BwError::new(BwErrorKind::NotFound)
                .with_entity_id(alert_id)
                .with_message(message),
            BeatwatchError::VerificationRequestNotFound { request_id } => {
                BwError::new(BwErrorKind::NotFound)
                    .with_entity_id(request_id)
                    .with_message(message)
            }
            BeatwatchError::RegistrationNotFound { registration_id } => {
                BwError::new(BwErrorKind::NotFound)
                    .with_entity_id(registration_id)
                    .with_message(message)
            }
            BeatwatchError::StationNotFound { station_id } => BwError::new(BwErrorKind::NotFound)
                .with_entity_id(station_id)
                .with_message(message),
            BeatwatchError::UnknownState { .. } => {
                BwError::new(BwErrorKind::UnknownState).with_message(message)
            }
            BeatwatchError::InvalidTransition { allowed, .. } => {
                BwError::new(BwErrorKind::InvalidTransition)
                    .with_message(message)
                    .with_details(allowed)
            }
            BeatwatchError::GuardUnmet { .. } => {
                BwError::new(BwErrorKind::GuardUnmet).with_message(message)
            }
            BeatwatchError::ScopeDenied { entity_id, .. } => {
                BwError::new(BwErrorKind::ScopeDenied)
                    .with_entity_id(entity_id)
                    .with_message(message)
            }
            BeatwatchError::Forbidden { .. } => {
                BwError::new(BwErrorKind::Forbidden).with_message(message)
            }
            BeatwatchError::SchedulingConflict {
                officer_id,
                visit_ids,
            } => BwError::new(BwErrorKind::SchedulingConflict)
                .with_entity_id(officer_id)
                .with_message(message)
                .with_details(visit_ids),
            BeatwatchError::AssignmentUnavailable { person_id } => {
                BwError::new(BwErrorKind::AssignmentUnavailable)
                    .with_entity_id(person_id)
                    .with_message(message)
            }
            BeatwatchError::DuplicateActiveAlert {
                person_id,
                alert_id,
            } => BwError::new(BwErrorKind::DuplicateActiveAlert)
                .with_entity_id(person_id)
                .with_message(message)
                .with_details(vec![alert_id]),
            BeatwatchError::InvalidInput { .. } => {
                BwError::new(BwErrorKind::InvalidInput).with_message(message)
            }
            BeatwatchError::InvalidConfig { .. } => {
                BwError::new(BwErrorKind::Config).with_message(message)
            }
            BeatwatchError::Serialization { .. } => {
                BwError::new(BwErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for BeatwatchError {
    fn from(err: serde_json::Error) -> Self {
        BeatwatchError::Serialization {
            message: err.to_string(),
        }
    }
}
