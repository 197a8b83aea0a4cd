//! Guard evidence read from the database

use beatwatch_core::workflow::GuardContext;
use beatwatch_core::BwError;
use rusqlite::Connection;

use crate::repo::VisitRepo;

/// [`GuardContext`] over a live connection (or transaction)
pub struct SqliteGuards<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteGuards<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl GuardContext for SqliteGuards<'_> {
    fn has_completed_verification_visit(&self, person_id: &str) -> Result<bool, BwError> {
        VisitRepo::has_completed_verification(self.conn, person_id)
    }
}
