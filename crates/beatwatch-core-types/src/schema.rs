//! Canonical schema constants for structured logging
//!
//! Field keys shared by the logging macros, the engine and the test capture
//! layer. Keep these stable: log pipelines filter on them.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_ACTOR_ID: &str = "actor_id";

// Entity identifiers
pub const FIELD_PERSON_ID: &str = "person_id";
pub const FIELD_OFFICER_ID: &str = "officer_id";
pub const FIELD_VISIT_ID: &str = "visit_id";
pub const FIELD_ALERT_ID: &str = "alert_id";
pub const FIELD_REGISTRATION_ID: &str = "registration_id";

// Workflow
pub const FIELD_ENTITY_KIND: &str = "entity_kind";
pub const FIELD_FROM_STATE: &str = "from_state";
pub const FIELD_TO_STATE: &str = "to_state";
pub const FIELD_CASCADE_STEP: &str = "cascade_step";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_entity_fields_are_snake_case() {
        for key in [
            FIELD_PERSON_ID,
            FIELD_OFFICER_ID,
            FIELD_VISIT_ID,
            FIELD_ALERT_ID,
            FIELD_REGISTRATION_ID,
        ] {
            assert!(key.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
