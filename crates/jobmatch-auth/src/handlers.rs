//! Handlers for the auth endpoints.
//!
//! | Method | Path        | Notes |
//! |--------|-------------|-------|
//! | `POST` | `/register` | Body: `{"name","email","password"}`; 201 + session. User service only |
//! | `POST` | `/login`    | Body: `{"email","password"}`; 200 + session |
//! | `GET`  | `/me`       | Bearer token required |
//! | `GET`  | `/accounts` | Bearer token required. Admin service only |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use jobmatch_core::{PublicIdentity, store::IdentityStore};

use crate::{
  AppState,
  error::AuthError,
  middleware::VerifiedIdentity,
  session::{LoginRequest, RegisterRequest, Session},
};

/// Turn axum's body rejection into our own 400 so every error has the same
/// shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
  payload
    .map(|Json(v)| v)
    .map_err(|e| AuthError::Validation(format!("malformed request body: {}", e.body_text())))
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError>
where
  S: IdentityStore + 'static,
{
  let session = state.issuer.register(body(payload)?).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Session>, AuthError>
where
  S: IdentityStore + 'static,
{
  let session = state.issuer.login(body(payload)?).await?;
  Ok(Json(session))
}

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  who: VerifiedIdentity,
) -> Result<Json<PublicIdentity>, AuthError>
where
  S: IdentityStore + 'static,
{
  Ok(Json(state.issuer.me(&who).await?))
}

/// `GET /accounts`
pub async fn accounts<S>(
  State(state): State<AppState<S>>,
  who: VerifiedIdentity,
) -> Result<Json<Vec<PublicIdentity>>, AuthError>
where
  S: IdentityStore + 'static,
{
  // The caller must still exist, not merely hold an unexpired token.
  state.issuer.me(&who).await?;
  Ok(Json(state.issuer.list_accounts().await?))
}
