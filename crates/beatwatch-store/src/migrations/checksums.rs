use sha2::{Digest, Sha256};

/// Hex SHA-256 of the migration text
pub fn compute_checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}
