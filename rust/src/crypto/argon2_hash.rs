//! Argon2id password encoder producing PHC strings.
//! Parameters are fixed per encoder so every record it writes uses the same
//! memory, iteration, and parallelism settings.

use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{trace, warn};

use crate::crypto::passwords::{Credential, HashError, HashRecord, PasswordEncoder};

pub const ALGORITHM_ID: &str = "argon2";

/// Default Argon2id parameters.
/// - memory_cost: 19 MiB keeps GPU cracking expensive while remaining server friendly
/// - time_cost: 3 iterations for interactive latency without sacrificing safety
/// - parallelism: 1 thread to keep resource usage predictable on shared hosts
pub const MEMORY_COST_KIB: u32 = 19 * 1024;
pub const TIME_COST: u32 = 3;
pub const PARALLELISM: u32 = 1;
const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Encoder {
    params: Params,
}

impl Argon2Encoder {
    pub fn new(memory_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, time_cost, parallelism, None)
            .map_err(|e| HashError::InvalidParameters(format!("argon2: {e}")))?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn parse<'a>(record: &'a HashRecord) -> Result<PasswordHash<'a>, HashError> {
        PasswordHash::new(record.as_str()).map_err(|e| {
            warn!(error = %e, "stored record is not a PHC string");
            HashError::MalformedRecord(format!("not a PHC string: {e}"))
        })
    }
}

impl Default for Argon2Encoder {
    fn default() -> Self {
        match Self::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM) {
            Ok(encoder) => encoder,
            Err(e) => {
                warn!(error = %e, "default argon2 parameters rejected, using library defaults");
                Self { params: Params::DEFAULT }
            }
        }
    }
}

impl PasswordEncoder for Argon2Encoder {
    fn algorithm_id(&self) -> &'static str {
        ALGORITHM_ID
    }

    fn hash(&self, credential: &Credential) -> Result<HashRecord, HashError> {
        trace!(m_cost = self.params.m_cost(), t_cost = self.params.t_cost(), "hashing credential with argon2id");

        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| HashError::EncodingError(format!("entropy source failed: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| HashError::EncodingError(format!("{e}")))?;

        let password_hash = self
            .argon2()
            .hash_password(credential.as_bytes(), &salt)
            .map_err(|e| HashError::EncodingError(format!("{e}")))?
            .to_string();
        Ok(HashRecord::new(password_hash))
    }

    fn matches(&self, candidate: &Credential, record: &HashRecord) -> Result<bool, HashError> {
        let parsed = Self::parse(record)?;
        trace!(algorithm = %parsed.algorithm, "verifying credential with argon2");

        // Verification runs with the parameters embedded in the record.
        match self.argon2().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::MalformedRecord(format!("unusable argon2 record: {e}"))),
        }
    }

    fn needs_rehash(&self, record: &HashRecord) -> Result<bool, HashError> {
        let parsed = Self::parse(record)?;
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return Ok(true);
        }
        let stored = Params::try_from(&parsed)
            .map_err(|e| HashError::MalformedRecord(format!("unusable argon2 parameters: {e}")))?;
        Ok(stored.m_cost() != self.params.m_cost()
            || stored.t_cost() != self.params.t_cost()
            || stored.p_cost() != self.params.p_cost())
    }
}
