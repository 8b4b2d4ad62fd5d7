//! The `IdentityStore` trait: the credential store adapter.
//!
//! The trait is implemented by storage backends (e.g. `jobmatch-store-sqlite`).
//! The auth layer depends on this abstraction, not on any concrete backend.
//! Schema provisioning is the backend's concern.

use std::future::Future;

use thiserror::Error;

use crate::identity::{BusinessCode, Email, Identity, NewIdentity};

/// Why [`IdentityStore::create`] refused to persist an identity.
#[derive(Debug, Error)]
pub enum CreateError<E> {
  /// A non-deleted identity already uses this email.
  #[error("email already registered")]
  EmailTaken,

  /// The business code is already assigned (possibly to a deleted identity).
  #[error("business code already assigned")]
  CodeTaken,

  #[error("store error: {0}")]
  Store(#[source] E),
}

/// Abstraction over an identity store backend for a single service.
///
/// Soft-deleted identities are invisible to every read method.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up a non-deleted identity by normalized email.
  fn find_by_email<'a>(
    &'a self,
    email: &'a Email,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Look up a non-deleted identity by business code.
  fn find_by_code<'a>(
    &'a self,
    code: &'a BusinessCode,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Persist a new identity. `created_at` and `updated_at` are set by the
  /// store.
  fn create(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, CreateError<Self::Error>>> + Send + '_;

  /// Mark an identity deleted. Returns `false` if no live identity has the
  /// code. The code stays reserved.
  fn soft_delete<'a>(
    &'a self,
    code: &'a BusinessCode,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// All non-deleted identities, oldest first.
  fn list(&self) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;
}
