//! Content fingerprints stored as page properties.

use sha2::{Digest, Sha256};

/// Property key holding the fingerprint of the last published body.
pub const CONTENT_HASH_KEY: &str = "content-hash";

/// Hex SHA-256 of a rendered page body.
pub fn content_hash(body: &str) -> String {
    bytes_hash(body.as_bytes())
}

/// Hex SHA-256 of raw bytes.
pub fn bytes_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Prefix of every attachment fingerprint key. It never overlaps
/// [`CONTENT_HASH_KEY`], whatever the file name.
const ATTACHMENT_HASH_PREFIX: &str = "attachment-hash:";

/// Property key holding the fingerprint of an attachment.
pub fn attachment_hash_key(file_name: &str) -> String {
    format!("{ATTACHMENT_HASH_PREFIX}{file_name}")
}
