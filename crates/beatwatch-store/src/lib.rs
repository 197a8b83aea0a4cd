//! SQLite persistence for the beatwatch engine
//!
//! - connection helpers and embedded, checksummed migrations
//! - one repository per entity table, all taking `&Connection` so they
//!   run equally inside a `Transaction`
//! - predicate rendering from the core's scope/filter trees to SQL
//! - guard evidence read straight from the visit table
//! - the notification outbox

pub mod db;
pub mod errors;
pub mod guards;
pub mod migrations;
pub mod repo;
pub mod sql;

pub use errors::Result;
pub use guards::SqliteGuards;
