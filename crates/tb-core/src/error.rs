//! Errors returned by ledger and tracker operations.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::ValidationError;

/// Ledger and session errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The break bucket cannot be deleted or renamed.
    #[error("bucket '{name}' is protected")]
    ProtectedBucket { name: String },

    /// No bucket with this name exists in the ledger.
    #[error("unknown bucket: {name}")]
    UnknownBucket { name: String },

    /// A rename target collides with an existing bucket.
    #[error("bucket already exists: {name}")]
    DuplicateBucket { name: String },

    /// The supplied bucket name failed validation.
    #[error(transparent)]
    InvalidName(#[from] ValidationError),

    /// Committing tracker state to the store failed.
    #[error("failed to persist tracker state")]
    PersistenceWrite(#[source] StoreError),

    /// Reading tracker state from the store failed.
    #[error("failed to restore tracker state")]
    PersistenceRead(#[source] StoreError),
}

impl TrackerError {
    pub(crate) fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownBucket { name: name.into() }
    }

    pub(crate) fn protected(name: impl Into<String>) -> Self {
        Self::ProtectedBucket { name: name.into() }
    }
}
