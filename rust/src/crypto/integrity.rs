//! Keyed-hash primitives shared by the password encoders. These helpers only
//! move bytes around; record formats and error mapping stay in the encoders.

use hmac::Hmac;
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("pbkdf2 rejected its key: {0}")]
    InvalidKey(String),
    #[error("pbkdf2 requires at least one round")]
    ZeroRounds,
    #[error("pbkdf2 output buffer is empty")]
    EmptyOutput,
}

/// Derives `out.len()` bytes from `password` and `salt` with PBKDF2-HMAC-SHA256
/// (RFC 8018, section 5.2).
pub fn pbkdf2_hmac_sha256(password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> Result<(), IntegrityError> {
    if rounds == 0 {
        return Err(IntegrityError::ZeroRounds);
    }
    if out.is_empty() {
        return Err(IntegrityError::EmptyOutput);
    }
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, rounds, out)
        .map_err(|e| IntegrityError::InvalidKey(format!("{e}")))
}

/// Compares two byte strings without an early exit on the first differing byte.
/// Slices of different length are never equal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
