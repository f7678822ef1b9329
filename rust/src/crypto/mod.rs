//! Password encoders and the primitives they share. The `passwords` module
//! defines the common types and the `PasswordEncoder` trait; each algorithm
//! lives in its own module and `delegating` ties them together by id.

pub mod argon2_hash;
pub mod bcrypt_hash;
pub mod delegating;
pub mod integrity;
pub mod passwords;
pub mod pbkdf2_hash;
