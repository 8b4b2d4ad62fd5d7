//! [`SqliteStore`], the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _};

use jobmatch_core::{
  BusinessCode, Email, Identity, NewIdentity, ServiceKind,
  store::{CreateError, IdentityStore},
};

use crate::{
  Result,
  encode::{IDENTITY_COLUMNS, RawIdentity, encode_dt},
  schema::schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An identity store for one service kind, backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  table: &'static str,
}

/// Outcome of an `INSERT`, decided inside the connection thread.
enum Inserted {
  Ok,
  EmailTaken,
  CodeTaken,
}

/// Classify a failed `INSERT` by the column whose uniqueness it violated:
/// "UNIQUE constraint failed: <table>.<column>". Any other failure, other
/// constraint kinds included, is `None`.
fn unique_violation(err: &rusqlite::Error) -> Option<Inserted> {
  let rusqlite::Error::SqliteFailure(failure, Some(msg)) = err else {
    return None;
  };
  if failure.code != ErrorCode::ConstraintViolation
    || !msg.starts_with("UNIQUE constraint failed")
  {
    return None;
  }
  if msg.ends_with(".email") {
    Some(Inserted::EmailTaken)
  } else if msg.ends_with(".code") {
    Some(Inserted::CodeTaken)
  } else {
    None
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and provision the table for `kind`.
  pub async fn open(path: impl AsRef<Path>, kind: ServiceKind) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, table: kind.table() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory(kind: ServiceKind) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, table: kind.table() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let ddl = schema(self.table);
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    tracing::debug!(table = self.table, "identity schema ready");
    Ok(())
  }

  /// Fetch at most one live row matching `column = value`.
  async fn find_live_by(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<Identity>> {
    let sql = format!(
      "SELECT {IDENTITY_COLUMNS} FROM {} WHERE {column} = ?1 AND deleted_at IS NULL",
      self.table
    );

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawIdentity::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = crate::Error;

  async fn find_by_email(&self, email: &Email) -> Result<Option<Identity>> {
    self.find_live_by("email", email.as_str().to_owned()).await
  }

  async fn find_by_code(&self, code: &BusinessCode) -> Result<Option<Identity>> {
    self.find_live_by("code", code.as_str().to_owned()).await
  }

  async fn create(
    &self,
    input: NewIdentity,
  ) -> Result<Identity, CreateError<crate::Error>> {
    let now = Utc::now();
    let identity = Identity {
      code:          input.code,
      name:          input.name,
      email:         input.email,
      password_hash: input.password_hash,
      created_at:    now,
      updated_at:    now,
      deleted_at:    None,
    };

    let sql = format!(
      "INSERT INTO {} (code, name, email, password_hash, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
      self.table
    );
    let code_str  = identity.code.as_str().to_owned();
    let name      = identity.name.clone();
    let email_str = identity.email.as_str().to_owned();
    let hash      = identity.password_hash.clone();
    let at_str    = encode_dt(now);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          &sql,
          rusqlite::params![code_str, name, email_str, hash, at_str],
        ) {
          Ok(_) => Ok(Inserted::Ok),
          Err(e) => match unique_violation(&e) {
            Some(outcome) => Ok(outcome),
            None => Err(e.into()),
          },
        }
      })
      .await
      .map_err(|e| CreateError::Store(e.into()))?;

    match inserted {
      Inserted::Ok => Ok(identity),
      Inserted::EmailTaken => Err(CreateError::EmailTaken),
      Inserted::CodeTaken => Err(CreateError::CodeTaken),
    }
  }

  async fn soft_delete(&self, code: &BusinessCode) -> Result<bool> {
    let sql = format!(
      "UPDATE {} SET deleted_at = ?1, updated_at = ?1
       WHERE code = ?2 AND deleted_at IS NULL",
      self.table
    );
    let at_str   = encode_dt(Utc::now());
    let code_str = code.as_str().to_owned();

    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![at_str, code_str])?))
      .await?;

    Ok(changed > 0)
  }

  async fn list(&self) -> Result<Vec<Identity>> {
    let sql = format!(
      "SELECT {IDENTITY_COLUMNS} FROM {} WHERE deleted_at IS NULL
       ORDER BY created_at, code",
      self.table
    );

    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }
}
