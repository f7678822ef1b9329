use std::sync::Arc;
use std::thread;

use password_encoder::{
    BcryptEncoder, BcryptRecord, Credential, DelegatingEncoder, EncoderConfig, HashError, HashRecord, PasswordEncoder,
    WorkFactor,
};
use rstest::*;

const PASSWORD: &str = "Yoseph1234^&";
const APPLICATION_SALT: &str = "__SALT__";

#[fixture]
fn fast_bcrypt() -> BcryptEncoder {
    BcryptEncoder::with_cost(WorkFactor::MIN)
}

#[fixture]
fn delegating() -> DelegatingEncoder {
    let config = EncoderConfig {
        cost: WorkFactor::MIN.get(),
        ..EncoderConfig::default()
    };
    config.build_encoder().expect("default config should build")
}

#[test]
fn default_cost_record_is_portable_bcrypt() {
    let encoder = BcryptEncoder::default();
    let record = encoder.hash(&Credential::from(PASSWORD)).expect("hashing should succeed");

    let parsed = BcryptRecord::parse(record.as_str()).expect("record should parse");
    assert_eq!(parsed.cost, WorkFactor::DEFAULT);
    assert!(record.as_str().starts_with("$2a$10$"));
    assert!(encoder.matches(&Credential::from(PASSWORD), &record).unwrap());
}

#[rstest]
fn salted_credential_hashes(fast_bcrypt: BcryptEncoder) {
    let credential = Credential::from(PASSWORD).with_suffix(APPLICATION_SALT);
    let record = fast_bcrypt.hash(&credential).unwrap();
    assert!(fast_bcrypt.matches(&credential, &record).unwrap());
    assert!(!fast_bcrypt.matches(&Credential::from(PASSWORD), &record).unwrap());
}

#[rstest]
fn wrong_candidate_does_not_match(fast_bcrypt: BcryptEncoder) {
    let record = fast_bcrypt.hash(&Credential::from(PASSWORD)).unwrap();
    assert!(fast_bcrypt.matches(&Credential::from("Yoseph1234^&"), &record).unwrap());
    assert!(!fast_bcrypt.matches(&Credential::from("Yoseph1234^&?"), &record).unwrap());
}

#[rstest]
fn repeated_hashing_always_matches(fast_bcrypt: BcryptEncoder) {
    let credential = Credential::from(PASSWORD);
    for _ in 0..100 {
        let record = fast_bcrypt.hash(&credential).unwrap();
        assert!(fast_bcrypt.matches(&credential, &record).unwrap());
    }
}

#[rstest]
fn two_records_differ_but_both_match(fast_bcrypt: BcryptEncoder) {
    let credential = Credential::from("1234567890ABCD^&%").with_suffix(APPLICATION_SALT);
    let first = fast_bcrypt.hash(&credential).unwrap();
    let second = fast_bcrypt.hash(&credential).unwrap();

    assert_ne!(first, second);
    assert!(fast_bcrypt.matches(&credential, &first).unwrap());
    assert!(fast_bcrypt.matches(&credential, &second).unwrap());
}

#[rstest]
#[case("")]
#[case("plaintext")]
#[case("$2a$10$short")]
#[case("{bcrypt}not-bcrypt-at-all")]
#[case("{bcrypt")]
fn malformed_records_are_recoverable(delegating: DelegatingEncoder, #[case] record: &str) {
    let err = delegating
        .matches(&Credential::from(PASSWORD), &HashRecord::from(record))
        .unwrap_err();
    assert!(matches!(err, HashError::MalformedRecord(_)), "{record:?} gave {err:?}");
    assert!(err.is_recoverable());
}

#[rstest]
#[case("p@ssw0rd!#$%^&*()")]
#[case("пароль密码🔒")]
#[case("")]
fn delegated_records_round_trip(delegating: DelegatingEncoder, #[case] password: &str) {
    let credential = Credential::from(password);
    let record = delegating.hash(&credential).unwrap();
    assert!(record.as_str().starts_with("{bcrypt}$2a$04$"));
    assert!(delegating.matches(&credential, &record).unwrap());
    assert!(!delegating.needs_rehash(&record).unwrap());
}

#[rstest]
fn accepts_untagged_bcrypt_records(fast_bcrypt: BcryptEncoder, delegating: DelegatingEncoder) {
    let record = fast_bcrypt.hash(&Credential::from(PASSWORD)).unwrap();
    assert!(delegating.matches(&Credential::from(PASSWORD), &record).unwrap());
    assert!(delegating.needs_rehash(&record).unwrap());
}

#[rstest]
fn shared_encoder_is_usable_across_threads(delegating: DelegatingEncoder) {
    let encoder: Arc<dyn PasswordEncoder> = Arc::new(delegating);
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let encoder = Arc::clone(&encoder);
            thread::spawn(move || {
                let credential = Credential::from(format!("worker-{worker}-{PASSWORD}"));
                let record = encoder.hash(&credential).unwrap();
                encoder.matches(&credential, &record).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("worker should not panic"));
    }
}
