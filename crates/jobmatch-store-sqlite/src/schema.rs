//! SQL schema for the jobmatch SQLite store.
//!
//! Executed once at connection startup. Idempotent thanks to
//! `IF NOT EXISTS`, so every service can open a shared database file and
//! provision only its own table.

/// Full schema DDL for the table backing one service kind.
pub fn schema(table: &str) -> String {
  format!(
    "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS {table} (
    code          TEXT PRIMARY KEY,   -- business code; never reused
    name          TEXT NOT NULL,
    email         TEXT NOT NULL,      -- trimmed + lower-cased
    password_hash TEXT NOT NULL,      -- argon2 PHC string
    created_at    TEXT NOT NULL,      -- ISO 8601 UTC
    updated_at    TEXT NOT NULL,
    deleted_at    TEXT                -- set on soft delete
);

-- Email is unique among live rows only; a soft-deleted identity releases
-- its address but keeps its code.
CREATE UNIQUE INDEX IF NOT EXISTS {table}_email_live_idx
    ON {table}(email) WHERE deleted_at IS NULL;

PRAGMA user_version = 1;
"
  )
}
