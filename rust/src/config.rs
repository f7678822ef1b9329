//! Encoder configuration. Settings are read from a JSON file (every key is
//! optional) and turned into a ready-to-use `DelegatingEncoder`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::crypto::argon2_hash::{self, Argon2Encoder};
use crate::crypto::bcrypt_hash::{self, BcryptEncoder, BcryptVersion, WorkFactor};
use crate::crypto::delegating::DelegatingEncoder;
use crate::crypto::pbkdf2_hash::{self, Pbkdf2Encoder};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid encoder settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_kib: argon2_hash::MEMORY_COST_KIB,
            time_cost: argon2_hash::TIME_COST,
            parallelism: argon2_hash::PARALLELISM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pbkdf2Settings {
    pub iterations: u32,
    pub salt_length: usize,
    pub hash_length: usize,
}

impl Default for Pbkdf2Settings {
    fn default() -> Self {
        Self {
            iterations: pbkdf2_hash::DEFAULT_ITERATIONS,
            salt_length: pbkdf2_hash::DEFAULT_SALT_LEN,
            hash_length: pbkdf2_hash::DEFAULT_HASH_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncoderConfig {
    /// Algorithm used for new records.
    pub algorithm_id: String,
    /// Algorithm assumed for records without an `{id}` prefix; `null` rejects them.
    pub default_for_matches: Option<String>,
    /// bcrypt work factor.
    pub cost: u32,
    /// bcrypt version tag written into new records.
    pub version: BcryptVersion,
    pub argon2: Argon2Settings,
    pub pbkdf2: Pbkdf2Settings,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            algorithm_id: bcrypt_hash::ALGORITHM_ID.to_string(),
            default_for_matches: Some(bcrypt_hash::ALGORITHM_ID.to_string()),
            cost: WorkFactor::DEFAULT.get(),
            version: BcryptVersion::default(),
            argon2: Argon2Settings::default(),
            pbkdf2: Pbkdf2Settings::default(),
        }
    }
}

impl EncoderConfig {
    pub fn bcrypt_encoder(&self) -> Result<BcryptEncoder, ConfigError> {
        let cost = WorkFactor::new(self.cost).map_err(|e| ConfigError::Invalid(format!("{e}")))?;
        Ok(BcryptEncoder::new(cost, self.version))
    }

    pub fn argon2_encoder(&self) -> Result<Argon2Encoder, ConfigError> {
        Argon2Encoder::new(self.argon2.memory_kib, self.argon2.time_cost, self.argon2.parallelism)
            .map_err(|e| ConfigError::Invalid(format!("{e}")))
    }

    pub fn pbkdf2_encoder(&self) -> Result<Pbkdf2Encoder, ConfigError> {
        Pbkdf2Encoder::new(self.pbkdf2.iterations, self.pbkdf2.salt_length, self.pbkdf2.hash_length)
            .map_err(|e| ConfigError::Invalid(format!("{e}")))
    }

    /// Registers every supported algorithm with these settings.
    pub fn build_encoder(&self) -> Result<DelegatingEncoder, ConfigError> {
        let mut builder = DelegatingEncoder::builder(self.algorithm_id.as_str())
            .register(self.bcrypt_encoder()?)
            .register(self.argon2_encoder()?)
            .register(self.pbkdf2_encoder()?);
        if let Some(id) = &self.default_for_matches {
            builder = builder.default_for_matches(id.as_str());
        }
        builder.build().map_err(|e| ConfigError::Invalid(format!("{e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_encoder().map(|_| ())
    }
}

/// Loads and validates the JSON configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<EncoderConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let config: EncoderConfig = serde_json::from_str(&raw_json)
        .map_err(|e| ConfigError::Parse(format!("{e}")))?;
    config.validate()?;
    debug!(algorithm = %config.algorithm_id, cost = config.cost, "loaded encoder config");
    Ok(config)
}
