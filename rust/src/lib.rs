//! Salted one-way password hashing. bcrypt is the default algorithm and its
//! records stay byte-compatible with other bcrypt implementations; a delegating
//! encoder adds `{id}`-tagged records for argon2 and pbkdf2.

pub mod config;
pub mod crypto;

pub use crate::config::{load_config, ConfigError, EncoderConfig};
pub use crate::crypto::bcrypt_hash::{BcryptEncoder, BcryptRecord, BcryptVersion, WorkFactor};
pub use crate::crypto::delegating::DelegatingEncoder;
pub use crate::crypto::passwords::{Credential, HashError, HashRecord, PasswordEncoder};
