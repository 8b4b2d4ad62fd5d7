//! Signed bearer tokens (HS256 JWT).
//!
//! Each service signs with its own secret, so a token minted by one service
//! never verifies against another, and rotating the secret invalidates every
//! outstanding token at once.

use chrono::{DateTime, TimeDelta, Utc};
use jobmatch_core::{BusinessCode, Email, ServiceKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("signing secret must not be empty")]
  EmptySecret,

  #[error("token lifetime must be at least one second")]
  InvalidTtl,

  #[error("timestamp out of range")]
  TimeOutOfRange,

  #[error("token signing failed: {0}")]
  Signing(#[source] jsonwebtoken::errors::Error),

  /// Bad signature, bad structure or bad claims.
  #[error("token rejected: {0}")]
  Rejected(#[source] jsonwebtoken::errors::Error),

  #[error("token expired")]
  Expired,
}

/// Claims carried inside every token.
///
/// `sub` is the identity's business code; what kind of code it is follows
/// from `role` (a staff, admin or agent code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
  pub sub:   BusinessCode,
  pub email: Email,
  pub role:  ServiceKind,
  /// Issued-at, Unix seconds.
  pub iat:   i64,
  /// Expiry, Unix seconds. Always greater than `iat`.
  pub exp:   i64,
}

impl SessionClaims {
  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.exp, 0)
  }
}

/// A freshly minted token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct SignedToken {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens for one service.
#[derive(Clone)]
pub struct TokenCodec {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        TimeDelta,
  kind:       ServiceKind,
}

impl TokenCodec {
  pub fn new(secret: &[u8], ttl: TimeDelta, kind: ServiceKind) -> Result<Self, TokenError> {
    if secret.is_empty() {
      return Err(TokenError::EmptySecret);
    }
    if ttl.num_seconds() < 1 {
      return Err(TokenError::InvalidTtl);
    }

    // Expiry is checked by hand against an explicit clock with zero leeway.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    Ok(Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
      kind,
    })
  }

  pub fn kind(&self) -> ServiceKind { self.kind }

  pub fn ttl(&self) -> TimeDelta { self.ttl }

  /// Mint a token for `code` valid from now until now + ttl.
  pub fn sign(&self, code: &BusinessCode, email: &Email) -> Result<SignedToken, TokenError> {
    self.sign_at(code, email, Utc::now())
  }

  /// Like [`sign`](Self::sign) with an explicit clock.
  pub fn sign_at(
    &self,
    code:  &BusinessCode,
    email: &Email,
    now:   DateTime<Utc>,
  ) -> Result<SignedToken, TokenError> {
    let iat = now.timestamp();
    let exp = iat
      .checked_add(self.ttl.num_seconds())
      .ok_or(TokenError::TimeOutOfRange)?;
    let expires_at = DateTime::from_timestamp(exp, 0).ok_or(TokenError::TimeOutOfRange)?;

    let claims = SessionClaims {
      sub: code.clone(),
      email: email.clone(),
      role: self.kind,
      iat,
      exp,
    };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(TokenError::Signing)?;

    Ok(SignedToken { token, expires_at })
  }

  /// Verify `token` and return its claims if it is still valid now.
  pub fn parse(&self, token: &str) -> Result<SessionClaims, TokenError> {
    self.parse_at(token, Utc::now())
  }

  /// Like [`parse`](Self::parse) with an explicit clock. A token is valid
  /// strictly before its `exp`.
  pub fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
    let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
      .map_err(TokenError::Rejected)?
      .claims;

    if claims.exp <= claims.iat || now.timestamp() >= claims.exp {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use base64::Engine as _;
  use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;

  fn codec(secret: &str) -> TokenCodec {
    TokenCodec::new(secret.as_bytes(), TimeDelta::hours(24), ServiceKind::User).unwrap()
  }

  fn code() -> BusinessCode { BusinessCode::parse("S1A2B3C4D").unwrap() }

  fn email() -> Email { Email::parse("ana@example.com").unwrap() }

  #[test]
  fn round_trip_preserves_subject_and_ttl() {
    let c = codec("s1");
    let signed = c.sign(&code(), &email()).unwrap();
    let claims = c.parse(&signed.token).unwrap();

    assert_eq!(claims.sub, code());
    assert_eq!(claims.email, email());
    assert_eq!(claims.role, ServiceKind::User);
    assert_eq!(claims.exp - claims.iat, TimeDelta::hours(24).num_seconds());
    assert_eq!(claims.expires_at(), Some(signed.expires_at));
  }

  #[test]
  fn token_is_three_url_safe_segments() {
    let signed = codec("s1").sign(&code(), &email()).unwrap();
    let parts: Vec<&str> = signed.token.split('.').collect();
    assert_eq!(parts.len(), 3);
    for part in parts {
      assert!(B64URL.decode(part).is_ok(), "segment not base64url: {part}");
    }
  }

  #[test]
  fn other_secret_is_rejected() {
    let signed = codec("s1").sign(&code(), &email()).unwrap();
    assert!(matches!(codec("s2").parse(&signed.token), Err(TokenError::Rejected(_))));
  }

  #[test]
  fn expired_token_is_rejected_despite_valid_signature() {
    let c = codec("s1");
    let issued = Utc::now() - TimeDelta::hours(25);
    let signed = c.sign_at(&code(), &email(), issued).unwrap();
    assert!(matches!(c.parse(&signed.token), Err(TokenError::Expired)));
  }

  #[test]
  fn token_is_invalid_exactly_at_expiry() {
    let c = codec("s1");
    let now = Utc::now();
    let signed = c.sign_at(&code(), &email(), now).unwrap();
    let just_before = signed.expires_at - TimeDelta::seconds(1);
    assert!(c.parse_at(&signed.token, just_before).is_ok());
    assert!(matches!(
      c.parse_at(&signed.token, signed.expires_at),
      Err(TokenError::Expired)
    ));
  }

  #[test]
  fn tampered_payload_is_rejected() {
    let c = codec("s1");
    let signed = c.sign(&code(), &email()).unwrap();
    let mut parts: Vec<String> = signed.token.split('.').map(str::to_owned).collect();

    let mut payload: serde_json::Value =
      serde_json::from_slice(&B64URL.decode(&parts[1]).unwrap()).unwrap();
    payload["sub"] = serde_json::json!("S00000000");
    parts[1] = B64URL.encode(serde_json::to_vec(&payload).unwrap());

    let forged = parts.join(".");
    assert!(matches!(c.parse(&forged), Err(TokenError::Rejected(_))));
  }

  #[test]
  fn unsigned_token_is_rejected() {
    let c = codec("s1");
    let signed = c.sign(&code(), &email()).unwrap();
    let parts: Vec<&str> = signed.token.split('.').collect();
    let header = B64URL.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let forged = format!("{header}.{}.", parts[1]);
    assert!(c.parse(&forged).is_err());
  }

  #[test]
  fn garbage_is_rejected() {
    let c = codec("s1");
    for token in ["", "abc", "a.b.c", "...."] {
      assert!(c.parse(token).is_err(), "{token:?}");
    }
  }

  #[test]
  fn constructor_rejects_bad_config() {
    assert!(matches!(
      TokenCodec::new(b"", TimeDelta::hours(1), ServiceKind::User),
      Err(TokenError::EmptySecret)
    ));
    assert!(matches!(
      TokenCodec::new(b"s", TimeDelta::zero(), ServiceKind::User),
      Err(TokenError::InvalidTtl)
    ));
  }
}
