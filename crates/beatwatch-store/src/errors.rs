//! Store-side error helpers over the core `BwError`

use beatwatch_core::errors::{BwError, BwErrorKind};
use rusqlite::ErrorCode;

pub type Result<T> = std::result::Result<T, BwError>;

pub fn migration_error(migration_id: &str, reason: &str) -> BwError {
    BwError::new(BwErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration whose embedded SQL has since changed
pub fn checksum_mismatch(migration_id: &str, recorded: &str, embedded: &str) -> BwError {
    BwError::new(BwErrorKind::ConstraintViolation)
        .with_op("migration_checksum")
        .with_entity_id(migration_id)
        .with_message(format!(
            "Migration {} was applied with checksum {} but the embedded SQL hashes to {}",
            migration_id, recorded, embedded
        ))
}

/// Classify a rusqlite failure
///
/// Constraint failures (unique, foreign key, check) become
/// `ConstraintViolation` so callers can translate them into domain errors;
/// everything else is `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> BwError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            BwErrorKind::ConstraintViolation
        }
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            BwErrorKind::Serialization
        }
        _ => BwErrorKind::Persistence,
    };
    BwError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}
