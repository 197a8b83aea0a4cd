//! Beatwatch engine - orchestration layer
//!
//! Coordinates the pure core with the SQLite store: scoped reads, status
//! transitions, visit scheduling, officer assignment, cascades, emergency
//! alerts and notification delivery.
//!
//! ## Logging ownership
//!
//! Every public operation is bracketed by `log_op_start!` / `log_op_end!` /
//! `log_op_error!`. Store and core emit only `tracing::debug!` details.

pub mod alerts;
pub mod assignment;
pub mod cascade;
pub mod commands;
pub mod context;
pub mod intake;
pub mod notifications;
pub mod reads;
pub mod scheduling;
pub mod transition;

pub use context::EngineContext;
