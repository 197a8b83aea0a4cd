//! Schema migrations
//!
//! SQL files are embedded at compile time, applied in order, each in its
//! own transaction, and recorded with a SHA-256 checksum. Re-running is a
//! no-op; an applied migration whose SQL has changed is refused.

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations, AppliedMigration};
