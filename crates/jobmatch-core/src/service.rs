//! Which identity-owning service a process runs as.
//!
//! Every service owns exactly one kind of principal and signs tokens with its
//! own secret. The kind decides what a token subject means, which table backs
//! the store, and where the routes are mounted.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceKind {
  /// Platform users (job seekers); the subject is their staff code.
  #[default]
  User,
  /// Back-office administrators; the subject is the admin code.
  Admin,
  /// Recruiting agents; the subject is the agent code.
  Agent,
}

impl ServiceKind {
  /// One-letter prefix of every business code minted for this kind.
  pub fn code_prefix(self) -> char {
    match self {
      ServiceKind::User => 'S',
      ServiceKind::Admin => 'A',
      ServiceKind::Agent => 'G',
    }
  }

  /// Name of the table holding this kind's identities.
  pub fn table(self) -> &'static str {
    match self {
      ServiceKind::User => "users",
      ServiceKind::Admin => "admins",
      ServiceKind::Agent => "agents",
    }
  }

  /// Human-readable name of the subject attribute, e.g. for logs.
  pub fn subject_attribute(self) -> &'static str {
    match self {
      ServiceKind::User => "staff_code",
      ServiceKind::Admin => "admin_code",
      ServiceKind::Agent => "agent_code",
    }
  }

  /// Path under which the auth routes of this service are mounted.
  pub fn route_prefix(self) -> &'static str {
    match self {
      ServiceKind::User => "/api/v1/auth",
      ServiceKind::Admin => "/api/v1/admin",
      ServiceKind::Agent => "/api/v1/agent",
    }
  }

  /// Only platform users may sign themselves up. Admin and agent accounts
  /// are provisioned out of band.
  pub fn allows_self_registration(self) -> bool {
    matches!(self, ServiceKind::User)
  }
}
