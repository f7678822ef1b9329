//! PBKDF2-HMAC-SHA256 password encoder.
//!
//! Records are lowercase hex of `salt || derived key`. The iteration count is
//! not part of the record, so an encoder only verifies records written with
//! its own count.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{trace, warn};
use zeroize::Zeroize;

use crate::crypto::integrity::{constant_time_eq, pbkdf2_hmac_sha256};
use crate::crypto::passwords::{Credential, HashError, HashRecord, PasswordEncoder};

pub const ALGORITHM_ID: &str = "pbkdf2";

pub const DEFAULT_ITERATIONS: u32 = 310_000;
pub const DEFAULT_SALT_LEN: usize = 16;
pub const DEFAULT_HASH_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Encoder {
    iterations: u32,
    salt_len: usize,
    hash_len: usize,
}

impl Pbkdf2Encoder {
    pub fn new(iterations: u32, salt_len: usize, hash_len: usize) -> Result<Self, HashError> {
        if iterations == 0 || salt_len == 0 || hash_len == 0 {
            return Err(HashError::InvalidParameters(format!(
                "pbkdf2 parameters must be positive (iterations={iterations}, salt={salt_len}, hash={hash_len})"
            )));
        }
        Ok(Self { iterations, salt_len, hash_len })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn derive(&self, credential: &Credential, salt: &[u8]) -> Result<Vec<u8>, HashError> {
        let mut derived = vec![0u8; self.hash_len];
        pbkdf2_hmac_sha256(credential.as_bytes(), salt, self.iterations, &mut derived)
            .map_err(|e| HashError::EncodingError(format!("{e}")))?;
        Ok(derived)
    }
}

impl Default for Pbkdf2Encoder {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt_len: DEFAULT_SALT_LEN,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}

impl PasswordEncoder for Pbkdf2Encoder {
    fn algorithm_id(&self) -> &'static str {
        ALGORITHM_ID
    }

    fn hash(&self, credential: &Credential) -> Result<HashRecord, HashError> {
        trace!(iterations = self.iterations, "hashing credential with pbkdf2");

        let mut salt = vec![0u8; self.salt_len];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| HashError::EncodingError(format!("entropy source failed: {e}")))?;

        let mut derived = self.derive(credential, &salt)?;
        salt.extend_from_slice(&derived);
        derived.zeroize();
        Ok(HashRecord::new(hex::encode(salt)))
    }

    fn matches(&self, candidate: &Credential, record: &HashRecord) -> Result<bool, HashError> {
        let decoded = hex::decode(record.as_str()).map_err(|e| {
            warn!(error = %e, "stored record is not hex encoded");
            HashError::MalformedRecord(format!("not a pbkdf2 record: {e}"))
        })?;
        if decoded.len() != self.salt_len + self.hash_len {
            warn!(len = decoded.len(), "stored pbkdf2 record has unexpected length");
            return Err(HashError::MalformedRecord(format!(
                "expected {} bytes, found {}",
                self.salt_len + self.hash_len,
                decoded.len()
            )));
        }

        let (salt, expected) = decoded.split_at(self.salt_len);
        let derived = self.derive(candidate, salt)?;
        Ok(constant_time_eq(&derived, expected))
    }
}
