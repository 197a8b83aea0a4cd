//! Command dispatch
//!
//! A single entry point that maps serialisable engine commands onto the
//! operation modules.

pub mod engine_command;

pub use engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
