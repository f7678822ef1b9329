//! Shared vocabulary for password encoders: the credential and record types,
//! the error taxonomy, and the `PasswordEncoder` seam every algorithm plugs
//! into.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The stored record does not parse as the expected encoding.
    #[error("malformed hash record: {0}")]
    MalformedRecord(String),
    /// Entropy or encoding failure while creating a record.
    #[error("encoding failed: {0}")]
    EncodingError(String),
    /// A delegated record names an algorithm with no registered encoder.
    #[error("no encoder registered for algorithm id {0:?}")]
    UnknownAlgorithm(String),
    #[error("work factor {0} is outside the supported range 4..=31")]
    InvalidWorkFactor(u32),
    /// Encoder construction was given unusable algorithm parameters.
    #[error("invalid encoder parameters: {0}")]
    InvalidParameters(String),
}

impl HashError {
    /// Recoverable errors come from bad stored input; callers should treat them
    /// as a failed authentication. Everything else is an operator problem.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HashError::MalformedRecord(_) | HashError::UnknownAlgorithm(_))
    }
}

/// Plaintext credential bytes. The buffer is wiped when the value is dropped
/// and never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Vec<u8>);

impl Credential {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Appends an application-level salt, producing the credential that is
    /// actually hashed.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let mut bytes = Vec::with_capacity(self.0.len() + suffix.len());
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(suffix.as_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for Credential {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes redacted>)", self.0.len())
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Encoded, self-describing hash output. Safe to persist and to log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashRecord(String);

impl HashRecord {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for HashRecord {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for HashRecord {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-way password hashing algorithm.
///
/// Implementations hold only immutable configuration, so a single instance can
/// be shared across threads. `matches` returns `Ok(false)` for a wrong
/// candidate; errors are reserved for records that cannot be interpreted.
pub trait PasswordEncoder: Send + Sync {
    /// Tag used by the delegating encoder, e.g. `bcrypt`.
    fn algorithm_id(&self) -> &'static str;

    /// Hashes `credential` with a freshly generated salt.
    fn hash(&self, credential: &Credential) -> Result<HashRecord, HashError>;

    /// Checks `candidate` against a record previously produced by `hash`.
    fn matches(&self, candidate: &Credential, record: &HashRecord) -> Result<bool, HashError>;

    /// Whether `record` was produced with weaker settings than this encoder
    /// currently uses and should be re-hashed after a successful match.
    fn needs_rehash(&self, _record: &HashRecord) -> Result<bool, HashError> {
        Ok(false)
    }
}
