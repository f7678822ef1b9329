//! Registry of password encoders keyed by algorithm id.
//!
//! New records are written as `{id}<record>` using the default encoder. When
//! verifying, the `{id}` prefix is resolved once to the registered encoder and
//! the remainder of the record is handed to it untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::crypto::argon2_hash::{self, Argon2Encoder};
use crate::crypto::bcrypt_hash::{self, BcryptEncoder};
use crate::crypto::passwords::{Credential, HashError, HashRecord, PasswordEncoder};
use crate::crypto::pbkdf2_hash::{self, Pbkdf2Encoder};

const PREFIX_START: char = '{';
const PREFIX_END: char = '}';

pub const ALGORITHM_ID: &str = "delegating";

pub struct DelegatingEncoder {
    default_id: &'static str,
    default_encoder: Arc<dyn PasswordEncoder>,
    encoders: HashMap<&'static str, Arc<dyn PasswordEncoder>>,
    default_for_matches: Option<Arc<dyn PasswordEncoder>>,
}

pub struct DelegatingEncoderBuilder {
    default_id: String,
    encoders: HashMap<&'static str, Arc<dyn PasswordEncoder>>,
    default_for_matches: Option<String>,
}

impl DelegatingEncoder {
    /// bcrypt for new records, with argon2 and pbkdf2 accepted for
    /// verification. Untagged records are treated as bcrypt.
    pub fn with_defaults() -> Self {
        let bcrypt: Arc<dyn PasswordEncoder> = Arc::new(BcryptEncoder::default());
        let mut encoders: HashMap<&'static str, Arc<dyn PasswordEncoder>> = HashMap::new();
        encoders.insert(bcrypt_hash::ALGORITHM_ID, bcrypt.clone());
        encoders.insert(argon2_hash::ALGORITHM_ID, Arc::new(Argon2Encoder::default()));
        encoders.insert(pbkdf2_hash::ALGORITHM_ID, Arc::new(Pbkdf2Encoder::default()));

        Self {
            default_id: bcrypt_hash::ALGORITHM_ID,
            default_encoder: bcrypt.clone(),
            encoders,
            default_for_matches: Some(bcrypt),
        }
    }

    pub fn builder(default_id: impl Into<String>) -> DelegatingEncoderBuilder {
        DelegatingEncoderBuilder {
            default_id: default_id.into(),
            encoders: HashMap::new(),
            default_for_matches: None,
        }
    }

    pub fn default_id(&self) -> &'static str {
        self.default_id
    }

    /// Registered ids in sorted order.
    pub fn algorithm_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.encoders.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn resolve<'r>(&self, record: &'r str) -> Result<(&dyn PasswordEncoder, &'r str), HashError> {
        match split_prefix(record)? {
            Some((id, inner)) => match self.encoders.get(id) {
                Some(encoder) => Ok((encoder.as_ref(), inner)),
                None => {
                    warn!(id = %id, "no encoder registered for record prefix");
                    Err(HashError::UnknownAlgorithm(id.to_string()))
                }
            },
            None => match &self.default_for_matches {
                Some(encoder) => Ok((encoder.as_ref(), record)),
                None => {
                    warn!("record has no algorithm prefix and no fallback encoder is configured");
                    Err(HashError::UnknownAlgorithm(String::new()))
                }
            },
        }
    }
}

/// Splits `{id}rest` into `(id, rest)`. Records without a leading `{` have no
/// prefix; a `{` without its closing `}` is malformed.
fn split_prefix(record: &str) -> Result<Option<(&str, &str)>, HashError> {
    let Some(rest) = record.strip_prefix(PREFIX_START) else {
        return Ok(None);
    };
    match rest.find(PREFIX_END) {
        Some(end) => Ok(Some((&rest[..end], &rest[end + PREFIX_END.len_utf8()..]))),
        None => Err(HashError::MalformedRecord("unterminated algorithm prefix".to_string())),
    }
}

impl PasswordEncoder for DelegatingEncoder {
    fn algorithm_id(&self) -> &'static str {
        ALGORITHM_ID
    }

    fn hash(&self, credential: &Credential) -> Result<HashRecord, HashError> {
        let inner = self.default_encoder.hash(credential)?;
        Ok(HashRecord::new(format!(
            "{PREFIX_START}{}{PREFIX_END}{}",
            self.default_id,
            inner.as_str()
        )))
    }

    fn matches(&self, candidate: &Credential, record: &HashRecord) -> Result<bool, HashError> {
        let (encoder, inner) = self.resolve(record.as_str())?;
        trace!(algorithm = encoder.algorithm_id(), "delegating credential check");
        encoder.matches(candidate, &HashRecord::from(inner))
    }

    /// Any record not tagged with the default id needs an upgrade, including
    /// ids with no registered encoder.
    fn needs_rehash(&self, record: &HashRecord) -> Result<bool, HashError> {
        match split_prefix(record.as_str())? {
            Some((id, inner)) if id == self.default_id => self.default_encoder.needs_rehash(&HashRecord::from(inner)),
            Some((id, _)) => {
                if !self.encoders.contains_key(id) {
                    debug!(id = %id, "record uses an unregistered algorithm");
                }
                Ok(true)
            }
            // Untagged records are upgraded to the tagged form.
            None => Ok(true),
        }
    }
}

impl fmt::Debug for DelegatingEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingEncoder")
            .field("default_id", &self.default_id)
            .field("algorithm_ids", &self.algorithm_ids())
            .field(
                "default_for_matches",
                &self.default_for_matches.as_ref().map(|e| e.algorithm_id()),
            )
            .finish()
    }
}

impl DelegatingEncoderBuilder {
    /// Adds an encoder under its own `algorithm_id`, replacing any earlier
    /// registration for the same id.
    pub fn register(self, encoder: impl PasswordEncoder + 'static) -> Self {
        self.register_shared(Arc::new(encoder))
    }

    pub fn register_shared(mut self, encoder: Arc<dyn PasswordEncoder>) -> Self {
        let id = encoder.algorithm_id();
        if self.encoders.insert(id, encoder).is_some() {
            debug!(id = %id, "replacing registered encoder");
        }
        self
    }

    /// Encoder used for records that carry no `{id}` prefix.
    pub fn default_for_matches(mut self, id: impl Into<String>) -> Self {
        self.default_for_matches = Some(id.into());
        self
    }

    pub fn build(self) -> Result<DelegatingEncoder, HashError> {
        let (default_id, default_encoder) = self
            .encoders
            .get_key_value(self.default_id.as_str())
            .map(|(id, encoder)| (*id, encoder.clone()))
            .ok_or_else(|| HashError::UnknownAlgorithm(self.default_id.clone()))?;

        let default_for_matches = match &self.default_for_matches {
            Some(id) => Some(
                self.encoders
                    .get(id.as_str())
                    .cloned()
                    .ok_or_else(|| HashError::UnknownAlgorithm(id.clone()))?,
            ),
            None => None,
        };

        let encoder = DelegatingEncoder {
            default_id,
            default_encoder,
            encoders: self.encoders,
            default_for_matches,
        };
        debug!(?encoder, "built delegating password encoder");
        Ok(encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::{split_prefix, DelegatingEncoder};
    use crate::crypto::argon2_hash::Argon2Encoder;
    use crate::crypto::bcrypt_hash::{BcryptEncoder, WorkFactor};
    use crate::crypto::passwords::{Credential, HashError, HashRecord, PasswordEncoder};
    use crate::crypto::pbkdf2_hash::Pbkdf2Encoder;

    fn light_registry(default_id: &str) -> DelegatingEncoder {
        DelegatingEncoder::builder(default_id)
            .register(BcryptEncoder::with_cost(WorkFactor::MIN))
            .register(Argon2Encoder::new(1024, 1, 1).unwrap())
            .register(Pbkdf2Encoder::new(1_000, 16, 32).unwrap())
            .default_for_matches("bcrypt")
            .build()
            .expect("registry should build")
    }

    #[test]
    fn splits_algorithm_prefix() {
        assert_eq!(split_prefix("{bcrypt}$2a$").unwrap(), Some(("bcrypt", "$2a$")));
        assert_eq!(split_prefix("{}abc").unwrap(), Some(("", "abc")));
        assert_eq!(split_prefix("$2a$").unwrap(), None);
        assert!(matches!(split_prefix("{bcrypt$2a$"), Err(HashError::MalformedRecord(_))));
    }

    #[test]
    fn tags_records_with_default_id() {
        let encoder = light_registry("bcrypt");
        let record = encoder.hash(&Credential::from("Yoseph1234^&")).unwrap();
        assert!(record.as_str().starts_with("{bcrypt}$2a$04$"));
        assert!(encoder.matches(&Credential::from("Yoseph1234^&"), &record).unwrap());
        assert!(!encoder.matches(&Credential::from("Yoseph1234^&?"), &record).unwrap());
    }

    #[test]
    fn verifies_every_registered_algorithm() {
        let credential = Credential::from("1234567890ABCD^&%__SALT__");
        for id in ["bcrypt", "argon2", "pbkdf2"] {
            let writer = light_registry(id);
            let record = writer.hash(&credential).unwrap();
            assert!(record.as_str().starts_with(&format!("{{{id}}}")));

            let reader = light_registry("bcrypt");
            assert!(reader.matches(&credential, &record).unwrap(), "{id}");
            assert!(!reader.matches(&Credential::from("other"), &record).unwrap(), "{id}");
        }
    }

    #[test]
    fn falls_back_for_untagged_records() {
        let encoder = light_registry("bcrypt");
        let raw = BcryptEncoder::with_cost(WorkFactor::MIN).hash(&Credential::from("pw")).unwrap();
        assert!(encoder.matches(&Credential::from("pw"), &raw).unwrap());
    }

    #[test]
    fn untagged_records_fail_without_fallback() {
        let encoder = DelegatingEncoder::builder("bcrypt")
            .register(BcryptEncoder::with_cost(WorkFactor::MIN))
            .build()
            .unwrap();
        let raw = BcryptEncoder::with_cost(WorkFactor::MIN).hash(&Credential::from("pw")).unwrap();
        assert_eq!(
            encoder.matches(&Credential::from("pw"), &raw),
            Err(HashError::UnknownAlgorithm(String::new()))
        );
    }

    #[test]
    fn rejects_unknown_ids() {
        let encoder = light_registry("bcrypt");
        let record = HashRecord::from("{md5}5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(
            encoder.matches(&Credential::from("password"), &record),
            Err(HashError::UnknownAlgorithm("md5".to_string()))
        );
        assert!(encoder.needs_rehash(&record).unwrap());
    }

    #[test]
    fn refuses_unregistered_default() {
        let result = DelegatingEncoder::builder("scrypt")
            .register(BcryptEncoder::default())
            .build();
        assert!(matches!(result, Err(HashError::UnknownAlgorithm(id)) if id == "scrypt"));

        let result = DelegatingEncoder::builder("bcrypt")
            .register(BcryptEncoder::default())
            .default_for_matches("noop")
            .build();
        assert!(matches!(result, Err(HashError::UnknownAlgorithm(id)) if id == "noop"));
    }

    #[test]
    fn flags_records_for_upgrade() {
        let encoder = light_registry("bcrypt");
        let current = encoder.hash(&Credential::from("pw")).unwrap();
        let legacy = light_registry("pbkdf2").hash(&Credential::from("pw")).unwrap();
        let untagged = BcryptEncoder::with_cost(WorkFactor::MIN).hash(&Credential::from("pw")).unwrap();

        assert!(!encoder.needs_rehash(&current).unwrap());
        assert!(encoder.needs_rehash(&legacy).unwrap());
        assert!(encoder.needs_rehash(&untagged).unwrap());
    }

    #[test]
    fn default_registry_lists_algorithms() {
        let encoder = DelegatingEncoder::with_defaults();
        assert_eq!(encoder.default_id(), "bcrypt");
        assert_eq!(encoder.algorithm_ids(), vec!["argon2", "bcrypt", "pbkdf2"]);
        let printed = format!("{encoder:?}");
        assert!(printed.contains("default_for_matches: Some(\"bcrypt\")"));
    }
}
