//! Stateless authentication for the jobmatch services.
//!
//! Exposes an axum [`Router`] with register/login/me backed by any
//! [`IdentityStore`]. Each service mounts it under its own prefix, with its
//! own store and its own signing secret.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest(kind.route_prefix(), jobmatch_auth::router(state))
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use middleware::VerifiedIdentity;
pub use session::SessionIssuer;
pub use token::TokenCodec;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use jobmatch_core::{ServiceKind, store::IdentityStore};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
///
/// The issuer signs tokens; [`middleware::require_identity`] verifies them
/// with `codec`. [`AppState::new`] takes `codec` from the issuer, so both
/// always use the same secret.
pub struct AppState<S> {
  issuer: Arc<SessionIssuer<S>>,
  codec:  Arc<TokenCodec>,
}

impl<S> AppState<S> {
  pub fn new(issuer: SessionIssuer<S>) -> Self
  where
    S: IdentityStore,
  {
    let codec = issuer.codec().clone();
    Self { issuer: Arc::new(issuer), codec }
  }

  pub fn issuer(&self) -> &Arc<SessionIssuer<S>> { &self.issuer }

  /// The codec bearer tokens are verified with.
  pub fn codec(&self) -> &Arc<TokenCodec> { &self.codec }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { issuer: self.issuer.clone(), codec: self.codec.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the auth [`Router`] for the service the state was configured for.
///
/// Everything except `/register` and `/login` sits behind
/// [`middleware::require_identity`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: IdentityStore + 'static,
{
  let kind = state.issuer.kind();

  let mut protected = Router::new().route("/me", get(handlers::me::<S>));
  if kind == ServiceKind::Admin {
    protected = protected.route("/accounts", get(handlers::accounts::<S>));
  }
  let protected = protected.route_layer(axum::middleware::from_fn_with_state(
    state.codec.clone(),
    middleware::require_identity,
  ));

  let mut public = Router::new().route("/login", post(handlers::login::<S>));
  if kind.allows_self_registration() {
    public = public.route("/register", post(handlers::register::<S>));
  }

  public.merge(protected).with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
