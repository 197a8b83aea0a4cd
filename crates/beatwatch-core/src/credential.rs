//! Senior-citizen credential numbers

use sha2::{Digest, Sha256};

/// `{prefix}-{year}-{8 upper-case hex}`; the suffix is derived from the
/// person id, so reissuing for the same person and year is stable
pub fn credential_number(prefix: &str, year: i32, person_id: &str) -> String {
    let digest = Sha256::digest(person_id.as_bytes());
    format!("{}-{}-{}", prefix, year, hex::encode_upper(&digest[..4]))
}
