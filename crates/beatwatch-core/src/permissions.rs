//! Permission names checked by engine operations

pub const PERSON_CREATE: &str = "person:create";
pub const PERSON_ASSIGN: &str = "person:assign";
pub const PERSON_UPDATE_STATUS: &str = "person:update_status";
pub const PERSON_RELOCATE: &str = "person:relocate";
pub const VISIT_SCHEDULE: &str = "visit:schedule";
pub const VISIT_UPDATE_STATUS: &str = "visit:update_status";
pub const ALERT_RAISE: &str = "alert:raise";
pub const ALERT_UPDATE_STATUS: &str = "alert:update_status";
pub const VERIFICATION_UPDATE_STATUS: &str = "verification:update_status";
pub const REGISTRATION_REVIEW: &str = "registration:review";
