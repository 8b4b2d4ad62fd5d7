//! Core types and trait definitions for the jobmatch authentication core.
//!
//! This crate has no HTTP or database dependencies.
//! The store adapter and the auth layer depend on it; it depends on nothing
//! proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod identity;
pub mod registration;
pub mod service;
pub mod store;

pub use error::{Error, Result};
pub use identity::{BusinessCode, Email, Identity, NewIdentity, PublicIdentity};
pub use service::ServiceKind;
