//! Domain kernel for field-visit welfare monitoring
//!
//! Pure logic with no I/O: entity models and their status machines,
//! jurisdiction scoping, calendar conflict detection, workload-balanced
//! officer selection, SLA computation, configuration and the error and
//! logging facilities shared by the store and engine crates.

pub mod assignment;
pub mod config;
pub mod credential;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod notify;
pub mod permissions;
pub mod schedule;
pub mod scope;
pub mod sla;
pub mod workflow;

pub use config::EngineConfig;
pub use errors::{BeatwatchError, BwError, BwErrorKind, Result};
pub use scope::{resolve_scope, Caller, DataScope, Role};
pub use workflow::{validate_transition, EntityKind, WorkflowState};
