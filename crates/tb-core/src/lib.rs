//! Core time-accounting logic for time buckets.
//!
//! This crate contains the fundamental types and logic for:
//! - Buckets and the ordered, name-unique ledger that owns them
//! - Session tracking: the single active bucket and reconciliation of
//!   elapsed wall-clock time into it
//! - Persistence against an abstract key-value store, with drift recovery
//!   on restore
//! - The periodic tick schedule and the render model for views

mod bucket;
mod error;
mod ledger;
pub mod render;
pub mod session;
pub mod store;
pub mod ticker;
pub mod types;

pub use bucket::Bucket;
pub use error::TrackerError;
pub use ledger::BucketLedger;
pub use render::{BucketRow, RenderModel, format_clock_time, format_elapsed};
pub use session::{SessionState, SessionTracker};
pub use store::{KeyValueStore, MemoryStore, StoreError, StoredValue, WriteBatch, WriteOp};
pub use ticker::{DEFAULT_TICK_INTERVAL_MS, Ticker};
pub use types::{BucketName, ValidationError};
