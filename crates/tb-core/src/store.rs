//! Persistence interface for tracker state.
//!
//! The tracker only needs a typed key-value store with an atomic multi-key
//! commit. Reads return `Ok(None)` for absent keys; callers apply their own
//! defaults. Writes are collected in a [`WriteBatch`] and applied all at once
//! by [`KeyValueStore::commit`].

use std::collections::BTreeMap;

use thiserror::Error;

/// Logical key names used by the tracker.
pub mod keys {
    /// Ordered list of non-break bucket names.
    pub const BUCKET_NAMES: &str = "buckets.names";
    /// Prefix of per-bucket duration keys; the bucket name follows.
    pub const BUCKET_DURATION_PREFIX: &str = "buckets.duration.";
    /// Name of the active bucket.
    pub const ACTIVE_BUCKET: &str = "session.active";
    /// Epoch milliseconds at which the active bucket became active.
    pub const SESSION_STARTED_AT: &str = "session.started_at";
    /// Epoch milliseconds of the last reconciliation.
    pub const LAST_TICK: &str = "session.last_tick";

    /// Duration key for a bucket.
    pub fn bucket_duration(name: &str) -> String {
        format!("{BUCKET_DURATION_PREFIX}{name}")
    }
}

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored value has a different type than requested.
    #[error("key {key} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },
    /// The stored value could not be decoded.
    #[error("corrupt value for key {key}: {message}")]
    Corrupt { key: String, message: String },
    /// The commit was rejected; nothing was written.
    #[error("commit failed: {0}")]
    CommitFailed(String),
    /// An error from the underlying storage engine.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A value held by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    String(String),
    Long(i64),
    StringList(Vec<String>),
}

impl StoredValue {
    /// Type tag used in error messages and by storage backends.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Long(_) => "long",
            Self::StringList(_) => "string_list",
        }
    }
}

/// A single pending write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: StoredValue },
    Remove { key: String },
}

/// An ordered set of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.put(key, StoredValue::String(value.into()))
    }

    pub fn put_long(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.put(key, StoredValue::Long(value))
    }

    pub fn put_string_list(&mut self, key: impl Into<String>, values: Vec<String>) -> &mut Self {
        self.put(key, StoredValue::StringList(values))
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove { key: key.into() });
        self
    }

    fn put(&mut self, key: impl Into<String>, value: StoredValue) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Durable typed key-value store with atomic multi-key commit.
pub trait KeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn get_long(&self, key: &str) -> Result<Option<i64>, StoreError>;

    fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>, StoreError>;

    /// Applies every operation in the batch, or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// In-memory store.
///
/// Useful for tests and for callers that do not need durability. Commits can
/// be made to fail with [`MemoryStore::fail_commits`] to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, StoredValue>,
    fail_commits: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent commit fail without writing anything.
    pub fn fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }

    /// Returns the raw stored value for a key.
    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        self.entries.get(key)
    }

    /// Keys currently stored, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn typed<T>(
        &self,
        key: &str,
        expected: &'static str,
        extract: impl FnOnce(&StoredValue) -> Option<T>,
    ) -> Result<Option<T>, StoreError> {
        let Some(value) = self.entries.get(key) else {
            return Ok(None);
        };
        extract(value)
            .map(Some)
            .ok_or_else(|| StoreError::TypeMismatch {
                key: key.to_string(),
                expected,
                found: value.kind().to_string(),
            })
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.typed(key, "string", |v| match v {
            StoredValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn get_long(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.typed(key, "long", |v| match v {
            StoredValue::Long(n) => Some(*n),
            _ => None,
        })
    }

    fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>, StoreError> {
        self.typed(key, "string_list", |v| match v {
            StoredValue::StringList(list) => Some(list.clone()),
            _ => None,
        })
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_commits {
            return Err(StoreError::CommitFailed("memory store is read-only".into()));
        }
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { key, value } => {
                    self.entries.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    self.entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}
