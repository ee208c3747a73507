//! Storage layer for time buckets.
//!
//! Provides a durable [`KeyValueStore`] for tracker state using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved between threads but not shared without external
//! synchronization. The tracker is single-threaded, so one connection per
//! process is enough.
//!
//! # Schema
//!
//! A single `entries` table maps keys to typed values:
//! - `kind` is `string`, `long` or `string_list`
//! - `value` holds TEXT for strings, INTEGER for longs, and a JSON array of
//!   strings for string lists
//! - `updated_at` is the ISO 8601 time of the last write (e.g. `2024-01-15T10:30:00Z`)
//!
//! Every [`KeyValueStore::commit`] runs in one transaction, so a batch is
//! either fully applied or not at all.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use tb_core::{KeyValueStore, StoreError, StoredValue, WriteBatch, WriteOp};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored list could not be encoded or decoded.
    #[error("invalid list value for {key}: {source}")]
    InvalidList {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stored value does not match its declared kind.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidList { key, source } => Self::Corrupt {
                key,
                message: source.to_string(),
            },
            DbError::InvalidValue { key, message } => Self::Corrupt { key, message },
            other @ DbError::Sqlite(_) => Self::Backend(Box::new(other)),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A raw row of the `entries` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub key: String,
    pub kind: String,
    pub updated_at: String,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- kind: 'string' | 'long' | 'string_list'
            -- value: TEXT, INTEGER, or a JSON array of strings
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                value NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Lists all entries ordered by key.
    pub fn list_entries(&self) -> Result<Vec<EntryRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, kind, updated_at FROM entries ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(EntryRecord {
                key: row.get(0)?,
                kind: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Reads the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<StoredValue>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT kind, value FROM entries WHERE key = ?",
                [key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?)),
            )
            .optional()?;
        let Some((kind, value)) = row else {
            return Ok(None);
        };
        decode(key, &kind, value).map(Some)
    }

    /// Applies a batch of writes in a single transaction.
    pub fn apply(&mut self, batch: WriteBatch) -> Result<(), DbError> {
        if batch.is_empty() {
            return Ok(());
        }
        let updated_at = format_timestamp(Utc::now());
        let count = batch.len();
        let tx = self.conn.transaction()?;
        {
            let mut put_stmt = tx.prepare(
                "
                INSERT INTO entries (key, kind, value, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                    kind = excluded.kind,
                    value = excluded.value,
                    updated_at = excluded.updated_at
                ",
            )?;
            let mut remove_stmt = tx.prepare("DELETE FROM entries WHERE key = ?")?;
            for op in batch.into_ops() {
                match op {
                    WriteOp::Put { key, value } => {
                        let kind = value.kind();
                        let encoded = encode(&key, value)?;
                        put_stmt.execute(params![key, kind, encoded, updated_at])?;
                    }
                    WriteOp::Remove { key } => {
                        remove_stmt.execute([key])?;
                    }
                }
            }
        }
        tx.commit()?;
        tracing::trace!(ops = count, "committed batch");
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoredValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(key, "string", &other)),
        }
    }

    fn get_long(&self, key: &str) -> Result<Option<i64>, StoreError> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoredValue::Long(n)) => Ok(Some(n)),
            Some(other) => Err(mismatch(key, "long", &other)),
        }
    }

    fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>, StoreError> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoredValue::StringList(list)) => Ok(Some(list)),
            Some(other) => Err(mismatch(key, "string_list", &other)),
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        self.apply(batch).map_err(StoreError::from)
    }
}

fn mismatch(key: &str, expected: &'static str, found: &StoredValue) -> StoreError {
    StoreError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind().to_string(),
    }
}

fn encode(key: &str, value: StoredValue) -> Result<Value, DbError> {
    Ok(match value {
        StoredValue::String(s) => Value::Text(s),
        StoredValue::Long(n) => Value::Integer(n),
        StoredValue::StringList(list) => {
            let json = serde_json::to_string(&list).map_err(|source| DbError::InvalidList {
                key: key.to_string(),
                source,
            })?;
            Value::Text(json)
        }
    })
}

fn decode(key: &str, kind: &str, value: Value) -> Result<StoredValue, DbError> {
    match (kind, value) {
        ("string", Value::Text(s)) => Ok(StoredValue::String(s)),
        ("long", Value::Integer(n)) => Ok(StoredValue::Long(n)),
        ("string_list", Value::Text(json)) => serde_json::from_str(&json)
            .map(StoredValue::StringList)
            .map_err(|source| DbError::InvalidList {
                key: key.to_string(),
                source,
            }),
        (kind, value) => Err(DbError::InvalidValue {
            key: key.to_string(),
            message: format!("unexpected {} value for kind {kind}", value.data_type()),
        }),
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
