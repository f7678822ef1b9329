//! bcrypt records and the default password encoder.
//!
//! Records use the standard modular-crypt layout
//! `$<version>$<cost>$<22 char salt><31 char digest>`, so they stay
//! interchangeable with other bcrypt implementations. Hashing, record
//! encoding and digest comparison come from the `bcrypt` crate; this module
//! supplies the salt, pins the accepted versions and maps errors.

use std::fmt;
use std::str::FromStr;

use bcrypt::{BcryptError, HashParts, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::crypto::passwords::{Credential, HashError, HashRecord, PasswordEncoder};

pub const ALGORITHM_ID: &str = "bcrypt";

const SALT_LEN: usize = 16;
const RECORD_LEN: usize = 60;

/// bcrypt cost exponent; the key schedule runs `2^cost` rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkFactor(u32);

impl WorkFactor {
    pub const MIN: WorkFactor = WorkFactor(4);
    pub const MAX: WorkFactor = WorkFactor(31);
    /// Roughly 50-100 ms per hash on current server hardware.
    pub const DEFAULT: WorkFactor = WorkFactor(10);

    pub fn new(cost: u32) -> Result<Self, HashError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&cost) {
            Ok(Self(cost))
        } else {
            Err(HashError::InvalidWorkFactor(cost))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for WorkFactor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Minor version tag written after `$2`. All three share the same transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BcryptVersion {
    #[default]
    #[serde(rename = "2a")]
    TwoA,
    #[serde(rename = "2b")]
    TwoB,
    #[serde(rename = "2y")]
    TwoY,
}

impl BcryptVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            BcryptVersion::TwoA => "2a",
            BcryptVersion::TwoB => "2b",
            BcryptVersion::TwoY => "2y",
        }
    }
}

impl From<BcryptVersion> for Version {
    fn from(value: BcryptVersion) -> Self {
        match value {
            BcryptVersion::TwoA => Version::TwoA,
            BcryptVersion::TwoB => Version::TwoB,
            BcryptVersion::TwoY => Version::TwoY,
        }
    }
}

impl fmt::Display for BcryptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BcryptVersion {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2a" => Ok(BcryptVersion::TwoA),
            "2b" => Ok(BcryptVersion::TwoB),
            "2y" => Ok(BcryptVersion::TwoY),
            other => Err(HashError::MalformedRecord(format!("unsupported bcrypt version {other:?}"))),
        }
    }
}

/// Header of a bcrypt hash record: the fields needed to decide whether a
/// record is usable and whether it should be re-hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptRecord {
    pub version: BcryptVersion,
    pub cost: WorkFactor,
}

impl BcryptRecord {
    pub fn parse(encoded: &str) -> Result<Self, HashError> {
        if encoded.len() != RECORD_LEN || !encoded.is_ascii() {
            return Err(malformed("expected 60 ascii characters"));
        }
        if !encoded.starts_with("$2") {
            return Err(malformed("expected $2?$ prefix"));
        }
        let version: BcryptVersion = encoded[1..3].parse()?;

        let parts = HashParts::from_str(encoded).map_err(|e| malformed(&format!("{e}")))?;
        let cost = WorkFactor::new(parts.get_cost()).map_err(|_| malformed("cost out of range"))?;

        Ok(Self { version, cost })
    }
}

fn malformed(reason: &str) -> HashError {
    HashError::MalformedRecord(format!("not a bcrypt record: {reason}"))
}

/// bcrypt password encoder with a fixed cost and version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BcryptEncoder {
    cost: WorkFactor,
    version: BcryptVersion,
}

impl BcryptEncoder {
    pub fn new(cost: WorkFactor, version: BcryptVersion) -> Self {
        Self { cost, version }
    }

    pub fn with_cost(cost: WorkFactor) -> Self {
        Self { cost, ..Self::default() }
    }

    pub fn cost(&self) -> WorkFactor {
        self.cost
    }

    pub fn version(&self) -> BcryptVersion {
        self.version
    }

    /// Hashes with an explicit cost instead of the configured one.
    pub fn hash_with_cost(&self, credential: &Credential, cost: WorkFactor) -> Result<HashRecord, HashError> {
        trace!(cost = cost.get(), version = %self.version, "hashing credential with bcrypt");

        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| HashError::EncodingError(format!("entropy source failed: {e}")))?;

        let parts = bcrypt::hash_with_salt(credential.as_bytes(), cost.get(), salt)
            .map_err(|e| HashError::EncodingError(format!("{e}")))?;
        Ok(HashRecord::new(parts.format_for_version(self.version.into())))
    }

    fn parse_logged(record: &HashRecord) -> Result<BcryptRecord, HashError> {
        BcryptRecord::parse(record.as_str()).map_err(|err| {
            warn!(error = %err, "stored record does not look like bcrypt");
            err
        })
    }
}

impl PasswordEncoder for BcryptEncoder {
    fn algorithm_id(&self) -> &'static str {
        ALGORITHM_ID
    }

    fn hash(&self, credential: &Credential) -> Result<HashRecord, HashError> {
        self.hash_with_cost(credential, self.cost)
    }

    fn matches(&self, candidate: &Credential, record: &HashRecord) -> Result<bool, HashError> {
        let parsed = Self::parse_logged(record)?;
        trace!(cost = parsed.cost.get(), version = %parsed.version, "verifying credential with bcrypt");

        bcrypt::verify(candidate.as_bytes(), record.as_str()).map_err(|e: BcryptError| {
            warn!(error = %e, "stored bcrypt record could not be verified");
            malformed(&format!("{e}"))
        })
    }

    fn needs_rehash(&self, record: &HashRecord) -> Result<bool, HashError> {
        let parsed = Self::parse_logged(record)?;
        Ok(parsed.cost < self.cost)
    }
}
