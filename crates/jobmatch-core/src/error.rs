//! Error types for `jobmatch-core`.

use thiserror::Error;

use crate::registration::MIN_PASSWORD_LEN;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("name must not be empty")]
  EmptyName,

  #[error("email must not be empty")]
  EmptyEmail,

  #[error("email is not well-formed")]
  MalformedEmail,

  #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
  PasswordTooShort,

  #[error("invalid business code: {0:?}")]
  InvalidCode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
