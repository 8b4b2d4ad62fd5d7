//! Error taxonomy of the auth core and its HTTP mapping.
//!
//! Every variant maps to exactly one status code. Internal failures are
//! logged here and reported to the client as an opaque message.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::password::PasswordError;

#[derive(Debug, Error)]
pub enum AuthError {
  /// Malformed or missing input the caller can fix.
  #[error("{0}")]
  Validation(String),

  #[error("email already registered")]
  Conflict,

  /// Unknown email and wrong password share this variant.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("missing bearer token")]
  MissingCredential,

  /// Forged, expired and malformed tokens share this variant.
  #[error("invalid bearer token")]
  InvalidToken,

  #[error("not found")]
  NotFound,

  #[error("store error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("password hashing error: {0}")]
  Hashing(String),

  #[error("token signing error: {0}")]
  Signing(String),
}

impl AuthError {
  pub fn status(&self) -> StatusCode {
    match self {
      AuthError::Validation(_) => StatusCode::BAD_REQUEST,
      AuthError::Conflict => StatusCode::CONFLICT,
      AuthError::InvalidCredentials
      | AuthError::MissingCredential
      | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
      AuthError::NotFound => StatusCode::NOT_FOUND,
      AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::Signing(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  pub(crate) fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    AuthError::Storage(Box::new(e))
  }
}

impl From<jobmatch_core::Error> for AuthError {
  fn from(e: jobmatch_core::Error) -> Self { AuthError::Validation(e.to_string()) }
}

impl From<PasswordError> for AuthError {
  fn from(e: PasswordError) -> Self { AuthError::Hashing(e.to_string()) }
}

impl IntoResponse for AuthError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      AuthError::Validation(m) => m.clone(),
      AuthError::Conflict => "email already registered".to_owned(),
      AuthError::InvalidCredentials => "invalid credentials".to_owned(),
      // One body for both, so callers cannot tell absent from rejected.
      AuthError::MissingCredential | AuthError::InvalidToken => "unauthorized".to_owned(),
      AuthError::NotFound => "not found".to_owned(),
      AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::Signing(_) => {
        tracing::error!(error = %self, "internal error while handling request");
        "internal server error".to_owned()
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, AuthError::MissingCredential | AuthError::InvalidToken) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
      );
    }
    res
  }
}
