//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 UTC strings
//! (nanosecond precision, `Z` suffix), so text order is time order.

use chrono::{DateTime, SecondsFormat, Utc};
use jobmatch_core::{BusinessCode, Email, Identity};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawIdentity`].
pub const IDENTITY_COLUMNS: &str =
  "code, name, email, password_hash, created_at, updated_at, deleted_at";

/// Raw strings read directly from an identity row.
pub struct RawIdentity {
  pub code:          String,
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
  pub updated_at:    String,
  pub deleted_at:    Option<String>,
}

impl RawIdentity {
  /// Read a row selected with [`IDENTITY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      code:          row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      created_at:    row.get(4)?,
      updated_at:    row.get(5)?,
      deleted_at:    row.get(6)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      code:          BusinessCode::parse(&self.code)?,
      name:          self.name,
      email:         Email::parse(&self.email)?,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
      deleted_at:    self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
