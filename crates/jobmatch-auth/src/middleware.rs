//! Bearer-token middleware and the request-scoped verified identity.

use std::sync::Arc;

use axum::{
  extract::{FromRequestParts, Request, State},
  http::{HeaderMap, header, request::Parts},
  middleware::Next,
  response::Response,
};
use jobmatch_core::{BusinessCode, Email, ServiceKind};

use crate::{
  error::AuthError,
  token::{SessionClaims, TokenCodec},
};

/// The caller's identity, proven by a valid token on this request.
///
/// Lives in the request's extensions for the duration of one request and is
/// never stored anywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
  pub code:  BusinessCode,
  pub email: Email,
  pub role:  ServiceKind,
}

impl From<SessionClaims> for VerifiedIdentity {
  fn from(claims: SessionClaims) -> Self {
    Self { code: claims.sub, email: claims.email, role: claims.role }
  }
}

/// Validate the `Authorization` header against `codec`.
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Result<VerifiedIdentity, AuthError> {
  let token = bearer_token(headers)?;
  let claims = codec.parse(token).map_err(|e| {
    tracing::debug!(error = %e, "bearer token rejected");
    AuthError::InvalidToken
  })?;
  Ok(claims.into())
}

/// Extract the token after an exact `Bearer ` prefix.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(AuthError::MissingCredential)?;

  if token.is_empty() {
    return Err(AuthError::MissingCredential);
  }
  Ok(token)
}

/// Route layer: reject the request unless it carries a valid token, then
/// make the [`VerifiedIdentity`] available to the handler.
pub async fn require_identity(
  State(codec): State<Arc<TokenCodec>>,
  mut req: Request,
  next: Next,
) -> Result<Response, AuthError> {
  let identity = authenticate(req.headers(), &codec)?;
  req.extensions_mut().insert(identity);
  Ok(next.run(req).await)
}

/// Handlers take a `VerifiedIdentity` argument. Without the layer in front
/// the extraction fails closed.
impl<S> FromRequestParts<S> for VerifiedIdentity
where
  S: Send + Sync,
{
  type Rejection = AuthError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<VerifiedIdentity>()
      .cloned()
      .ok_or(AuthError::MissingCredential)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::http::HeaderValue;
  use chrono::TimeDelta;

  fn codec(secret: &str) -> TokenCodec {
    TokenCodec::new(secret.as_bytes(), TimeDelta::hours(1), ServiceKind::Agent).unwrap()
  }

  fn headers(auth: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
    h
  }

  fn token(c: &TokenCodec) -> String {
    let code = BusinessCode::parse("G0000CAFE").unwrap();
    let email = Email::parse("agent@example.com").unwrap();
    c.sign(&code, &email).unwrap().token
  }

  #[test]
  fn valid_bearer_yields_identity() {
    let c = codec("secret");
    let who = authenticate(&headers(&format!("Bearer {}", token(&c))), &c).unwrap();
    assert_eq!(who.code.as_str(), "G0000CAFE");
    assert_eq!(who.email.as_str(), "agent@example.com");
    assert_eq!(who.role, ServiceKind::Agent);
  }

  #[test]
  fn missing_header_is_missing_credential() {
    let c = codec("secret");
    assert!(matches!(authenticate(&HeaderMap::new(), &c), Err(AuthError::MissingCredential)));
  }

  #[test]
  fn prefix_must_match_exactly() {
    let c = codec("secret");
    let t = token(&c);
    for auth in [
      format!("bearer {t}"),
      format!("Bearer{t}"),
      format!("Basic {t}"),
      t.clone(),
      "Bearer ".to_owned(),
    ] {
      assert!(
        matches!(authenticate(&headers(&auth), &c), Err(AuthError::MissingCredential)),
        "{auth:?}"
      );
    }
  }

  #[test]
  fn foreign_token_is_invalid() {
    let other = codec("other-service-secret");
    let c = codec("secret");
    let auth = format!("Bearer {}", token(&other));
    assert!(matches!(authenticate(&headers(&auth), &c), Err(AuthError::InvalidToken)));
  }

  #[test]
  fn garbage_token_is_invalid() {
    let c = codec("secret");
    assert!(matches!(
      authenticate(&headers("Bearer not.a.jwt"), &c),
      Err(AuthError::InvalidToken)
    ));
  }

  #[tokio::test]
  async fn extractor_fails_closed_without_layer() {
    let req = axum::http::Request::builder().body(()).unwrap();
    let (mut parts, _) = req.into_parts();
    let res = VerifiedIdentity::from_request_parts(&mut parts, &()).await;
    assert!(matches!(res, Err(AuthError::MissingCredential)));
  }
}
