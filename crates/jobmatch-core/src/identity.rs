//! The authenticated principal owned by a service.
//!
//! An identity is keyed by its business code, never by a surrogate id. The
//! password hash stays inside this crate boundary: only [`PublicIdentity`] is
//! ever serialized to clients.

use std::fmt;

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, ServiceKind};

// ─── Business code ───────────────────────────────────────────────────────────

/// Maximum length of a business code; the store column is this wide.
pub const MAX_CODE_LEN: usize = 10;

/// Number of random bytes behind a generated code (two hex digits each).
const CODE_RANDOM_BYTES: usize = 4;

/// A short, stable, upper-case alphanumeric identifier, e.g. `S1F3A09BC`.
///
/// Codes are immutable once assigned and never reused, even after the
/// identity is soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BusinessCode(String);

impl BusinessCode {
  /// Mint a fresh code for `kind`: the kind's prefix letter followed by
  /// random upper-case hex from the OS entropy source.
  pub fn generate(kind: ServiceKind) -> Self {
    let mut bytes = [0u8; CODE_RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Self(format!("{}{}", kind.code_prefix(), hex::encode_upper(bytes)))
  }

  /// Accept an existing code, e.g. from a token subject or a database row.
  pub fn parse(s: &str) -> Result<Self> {
    let valid = !s.is_empty()
      && s.len() <= MAX_CODE_LEN
      && s.bytes().all(|b| b.is_ascii_alphanumeric());
    if valid {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidCode(s.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for BusinessCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for BusinessCode {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<BusinessCode> for String {
  fn from(code: BusinessCode) -> Self { code.0 }
}

// ─── Email ───────────────────────────────────────────────────────────────────

/// A normalized (trimmed, lower-cased) and well-formed email address.
///
/// Two inputs that differ only by case or surrounding whitespace produce the
/// same `Email`, which is what the uniqueness invariant is defined over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
  /// Normalize `raw` and check that the result looks like an address.
  pub fn parse(raw: &str) -> Result<Self> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
      return Err(Error::EmptyEmail);
    }
    if !is_well_formed(&normalized) {
      return Err(Error::MalformedEmail);
    }
    Ok(Self(normalized))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// One `@`, a non-empty local part, a dotted domain, no whitespace.
fn is_well_formed(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !domain.contains("..")
}

impl fmt::Display for Email {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for Email {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<Email> for String {
  fn from(email: Email) -> Self { email.0 }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// A stored principal, as returned by an [`IdentityStore`](crate::store::IdentityStore).
///
/// Not `Serialize`: the password hash must never leave the
/// server. Convert to [`PublicIdentity`] for any outward response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub code:          BusinessCode,
  pub name:          String,
  pub email:         Email,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
  /// Set when the identity has been soft-deleted. Such identities must be
  /// treated as non-existent for authentication.
  pub deleted_at:    Option<DateTime<Utc>>,
}

impl Identity {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  pub fn public(&self) -> PublicIdentity {
    PublicIdentity {
      code:  self.code.clone(),
      name:  self.name.clone(),
      email: self.email.clone(),
    }
  }
}

/// Input to [`IdentityStore::create`](crate::store::IdentityStore::create).
/// Timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub code:          BusinessCode,
  pub name:          String,
  pub email:         Email,
  pub password_hash: String,
}

/// The outward view of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
  pub code:  BusinessCode,
  pub name:  String,
  pub email: Email,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_is_trimmed_and_lowercased() {
    let email = Email::parse("  Ana@Example.COM ").unwrap();
    assert_eq!(email.as_str(), "ana@example.com");
  }

  #[test]
  fn emails_differing_by_case_and_space_are_equal() {
    assert_eq!(
      Email::parse(" Ana@Example.com ").unwrap(),
      Email::parse("ana@example.com").unwrap(),
    );
  }

  #[test]
  fn blank_email_is_empty() {
    assert_eq!(Email::parse("   "), Err(Error::EmptyEmail));
  }

  #[test]
  fn malformed_emails_are_rejected() {
    for raw in [
      "plainaddress",
      "@example.com",
      "ana@",
      "ana@localhost",
      "ana@@example.com",
      "ana@.example.com",
      "ana@example.com.",
      "ana@exa..mple.com",
      "an a@example.com",
    ] {
      assert_eq!(Email::parse(raw), Err(Error::MalformedEmail), "{raw:?}");
    }
  }

  #[test]
  fn generated_code_has_prefix_and_fits_column() {
    let code = BusinessCode::generate(ServiceKind::Agent);
    assert!(code.as_str().starts_with('G'));
    assert!(code.as_str().len() <= MAX_CODE_LEN);
    assert!(BusinessCode::parse(code.as_str()).is_ok());
  }

  #[test]
  fn generated_codes_differ() {
    let a = BusinessCode::generate(ServiceKind::User);
    let b = BusinessCode::generate(ServiceKind::User);
    assert_ne!(a, b);
  }

  #[test]
  fn code_parse_rejects_garbage() {
    assert!(BusinessCode::parse("").is_err());
    assert!(BusinessCode::parse("S-123").is_err());
    assert!(BusinessCode::parse("ABCDEFGHIJK").is_err());
  }

  #[test]
  fn public_view_has_no_hash() {
    let now = Utc::now();
    let identity = Identity {
      code:          BusinessCode::parse("S0000AAAA").unwrap(),
      name:          "Ana".into(),
      email:         Email::parse("ana@example.com").unwrap(),
      password_hash: "$argon2id$secret".into(),
      created_at:    now,
      updated_at:    now,
      deleted_at:    None,
    };
    let json = serde_json::to_value(identity.public()).unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "code": "S0000AAAA", "name": "Ana", "email": "ana@example.com" })
    );
  }
}
