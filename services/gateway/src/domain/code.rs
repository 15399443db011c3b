//! One-time link codes.
//!
//! Codes are 32 random bytes (256 bits) rendered as URL-safe base64. Only the
//! SHA-256 digest is persisted, and presented codes are compared digest to
//! digest in constant time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Random bytes per code before encoding.
pub const LINK_CODE_BYTES: usize = 32;

/// Generate a fresh link code from the thread-local CSPRNG.
pub fn generate_link_code() -> String {
    let bytes: [u8; LINK_CODE_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 of a code. This is the only form that reaches a store.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Compare a presented code against a stored digest without leaking, through
/// timing, how much of it matched.
pub fn code_matches(stored_hash: &str, presented: &str) -> bool {
    let presented_hash = hash_code(presented);
    stored_hash
        .as_bytes()
        .ct_eq(presented_hash.as_bytes())
        .into()
}
