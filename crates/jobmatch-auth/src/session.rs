//! The session issuer: register, login and "who am I".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobmatch_core::{
  BusinessCode, Email, Identity, NewIdentity, PublicIdentity, ServiceKind,
  registration::Registration,
  store::{CreateError, IdentityStore},
};
use serde::{Deserialize, Serialize};

use crate::{
  error::AuthError,
  middleware::VerifiedIdentity,
  password::Passwords,
  token::TokenCodec,
};

/// How many freshly generated codes to try before giving up on an insert.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Verified against when the email is unknown, so both login failures cost
/// one argon2 verification.
const DUMMY_PASSWORD: &str = "jobmatch-timing-equalizer";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
  pub email:    String,
  pub password: String,
}

/// A bearer session handed to the client after register or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub access_token: String,
  /// Always `"Bearer"`.
  pub token_type:   String,
  pub expires_at:   DateTime<Utc>,
  pub user:         PublicIdentity,
}

// ─── Issuer ──────────────────────────────────────────────────────────────────

/// Orchestrates the register and login flows for one service.
pub struct SessionIssuer<S> {
  store:      Arc<S>,
  codec:      Arc<TokenCodec>,
  passwords:  Passwords,
  dummy_hash: String,
}

impl<S: IdentityStore> SessionIssuer<S> {
  pub fn new(store: Arc<S>, codec: Arc<TokenCodec>) -> Result<Self, AuthError> {
    Self::with_passwords(store, codec, Passwords::default())
  }

  pub fn with_passwords(
    store:     Arc<S>,
    codec:     Arc<TokenCodec>,
    passwords: Passwords,
  ) -> Result<Self, AuthError> {
    let dummy_hash = passwords.hash(DUMMY_PASSWORD)?;
    Ok(Self { store, codec, passwords, dummy_hash })
  }

  pub fn kind(&self) -> ServiceKind { self.codec.kind() }

  pub fn codec(&self) -> &Arc<TokenCodec> { &self.codec }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Create an identity and sign it in.
  pub async fn register(&self, req: RegisterRequest) -> Result<Session, AuthError> {
    let identity = self.create_identity(req).await?;
    tracing::info!(
      kind = %self.kind(),
      code = %identity.code,
      "identity registered"
    );
    self.session_for(&identity)
  }

  /// Create an identity without signing it in. Used for accounts that
  /// cannot self-register.
  pub async fn provision(&self, req: RegisterRequest) -> Result<PublicIdentity, AuthError> {
    let identity = self.create_identity(req).await?;
    tracing::info!(
      kind = %self.kind(),
      code = %identity.code,
      "identity provisioned"
    );
    Ok(identity.public())
  }

  /// Exchange email and password for a session.
  pub async fn login(&self, req: LoginRequest) -> Result<Session, AuthError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
      return Err(AuthError::Validation("email and password are required".to_owned()));
    }

    // A malformed address cannot belong to anyone; treat it like an unknown one.
    let found = match Email::parse(&req.email) {
      Ok(email) => self.store.find_by_email(&email).await.map_err(AuthError::storage)?,
      Err(_) => None,
    };

    let hash = found
      .as_ref()
      .map_or_else(|| self.dummy_hash.clone(), |i| i.password_hash.clone());
    let matches = self.verify_password(req.password, hash).await?;

    match found {
      Some(identity) if matches => {
        tracing::info!(kind = %self.kind(), code = %identity.code, "login succeeded");
        self.session_for(&identity)
      }
      _ => {
        tracing::warn!(kind = %self.kind(), "login rejected");
        Err(AuthError::InvalidCredentials)
      }
    }
  }

  /// The public view of the caller. A token can outlive its identity by up
  /// to one TTL; such callers get `NotFound`.
  pub async fn me(&self, who: &VerifiedIdentity) -> Result<PublicIdentity, AuthError> {
    self
      .store
      .find_by_code(&who.code)
      .await
      .map_err(AuthError::storage)?
      .map(|i| i.public())
      .ok_or(AuthError::NotFound)
  }

  /// Every live identity of this service.
  pub async fn list_accounts(&self) -> Result<Vec<PublicIdentity>, AuthError> {
    let all = self.store.list().await.map_err(AuthError::storage)?;
    Ok(all.iter().map(Identity::public).collect())
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn create_identity(&self, req: RegisterRequest) -> Result<Identity, AuthError> {
    let reg = Registration::validate(&req.name, &req.email, req.password)?;

    if self
      .store
      .find_by_email(&reg.email)
      .await
      .map_err(AuthError::storage)?
      .is_some()
    {
      return Err(AuthError::Conflict);
    }

    let password_hash = self.hash_password(reg.password).await?;

    for attempt in 1..=MAX_CODE_ATTEMPTS {
      let input = NewIdentity {
        code:          BusinessCode::generate(self.kind()),
        name:          reg.name.clone(),
        email:         reg.email.clone(),
        password_hash: password_hash.clone(),
      };
      match self.store.create(input).await {
        Ok(identity) => return Ok(identity),
        Err(CreateError::CodeTaken) => {
          tracing::warn!(attempt, "business code collision, regenerating");
        }
        // Lost a race with a concurrent registration of the same address.
        Err(CreateError::EmailTaken) => return Err(AuthError::Conflict),
        Err(CreateError::Store(e)) => return Err(AuthError::storage(e)),
      }
    }

    Err(AuthError::Storage(
      format!("no free business code after {MAX_CODE_ATTEMPTS} attempts").into(),
    ))
  }

  fn session_for(&self, identity: &Identity) -> Result<Session, AuthError> {
    let signed = self
      .codec
      .sign(&identity.code, &identity.email)
      .map_err(|e| AuthError::Signing(e.to_string()))?;

    Ok(Session {
      access_token: signed.token,
      token_type:   "Bearer".to_owned(),
      expires_at:   signed.expires_at,
      user:         identity.public(),
    })
  }

  async fn hash_password(&self, password: String) -> Result<String, AuthError> {
    let passwords = self.passwords.clone();
    tokio::task::spawn_blocking(move || passwords.hash(&password))
      .await
      .map_err(|e| AuthError::Hashing(e.to_string()))?
      .map_err(AuthError::from)
  }

  async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
    let passwords = self.passwords.clone();
    tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
      .await
      .map_err(|e| AuthError::Hashing(e.to_string()))?
      .map_err(AuthError::from)
  }
}
