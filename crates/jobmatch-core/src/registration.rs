//! Validation of sign-up input.

use crate::{Email, Error, Result};

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Sign-up input that passed validation. The password is still plaintext;
/// hashing is the auth layer's job.
#[derive(Debug, Clone)]
pub struct Registration {
  pub name:     String,
  pub email:    Email,
  pub password: String,
}

impl Registration {
  /// Validate raw input: non-blank name, well-formed email, password of at
  /// least [`MIN_PASSWORD_LEN`] characters. The name is trimmed and the
  /// email normalized; the password is kept verbatim.
  pub fn validate(name: &str, email: &str, password: String) -> Result<Self> {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::EmptyName);
    }
    let email = Email::parse(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::PasswordTooShort);
    }
    Ok(Self { name: name.to_owned(), email, password })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_and_normalizes() {
    let r = Registration::validate(" Ana ", " Ana@Example.com ", "secret1".into()).unwrap();
    assert_eq!(r.name, "Ana");
    assert_eq!(r.email.as_str(), "ana@example.com");
    assert_eq!(r.password, "secret1");
  }

  #[test]
  fn rejects_blank_name() {
    let err = Registration::validate("  ", "ana@example.com", "secret1".into()).unwrap_err();
    assert_eq!(err, Error::EmptyName);
  }

  #[test]
  fn rejects_short_password() {
    let err = Registration::validate("Ana", "ana@example.com", "12345".into()).unwrap_err();
    assert_eq!(err, Error::PasswordTooShort);
  }

  #[test]
  fn six_characters_is_enough() {
    assert!(Registration::validate("Ana", "ana@example.com", "123456".into()).is_ok());
  }

  #[test]
  fn password_length_counts_characters() {
    // Six characters, more than six bytes.
    assert!(Registration::validate("Ana", "ana@example.com", "äöüäöü".into()).is_ok());
  }

  #[test]
  fn rejects_bad_email() {
    let err = Registration::validate("Ana", "", "secret1".into()).unwrap_err();
    assert_eq!(err, Error::EmptyEmail);
    let err = Registration::validate("Ana", "not-an-email", "secret1".into()).unwrap_err();
    assert_eq!(err, Error::MalformedEmail);
  }
}
