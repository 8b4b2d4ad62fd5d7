//! Salted one-way password hashing with argon2id.

use argon2::{
  Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _,
  PasswordVerifier as _, Version,
  password_hash::{self, SaltString},
};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
  #[error("password hashing failed: {0}")]
  Hashing(String),

  #[error("malformed password hash: {0}")]
  MalformedHash(String),
}

/// Hashes and verifies passwords. Cloning is cheap.
///
/// Hashing is slow; callers on an async runtime should run it
/// on the blocking pool.
#[derive(Clone, Default)]
pub struct Passwords {
  argon2: Argon2<'static>,
}

impl Passwords {
  /// Use explicit argon2id cost parameters instead of the library defaults.
  pub fn with_params(params: Params) -> Self {
    Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) }
  }

  /// Produce a PHC string with a fresh random salt.
  pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    self
      .argon2
      .hash_password(plaintext.as_bytes(), &salt)
      .map(|h| h.to_string())
      .map_err(|e| PasswordError::Hashing(e.to_string()))
  }

  /// Constant-time check of `plaintext` against a PHC string. A mismatch is
  /// `Ok(false)`; only an unparseable hash is an error.
  pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)
      .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(password_hash::Error::Password) => Ok(false),
      Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
    }
  }
}

#[cfg(test)]
pub(crate) fn cheap() -> Passwords {
  Passwords::with_params(Params::new(8, 1, 1, None).expect("valid argon2 params"))
}
