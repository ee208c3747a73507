//! Buckets: named accumulators of elapsed time.

use std::hash::{Hash, Hasher};

use crate::types::BucketName;

/// A named accumulator of elapsed wall-clock time.
///
/// Equality and hashing use the name only, so a bucket restored with a
/// different duration is still the same bucket.
#[derive(Debug, Clone)]
pub struct Bucket {
    name: BucketName,
    duration_ms: i64,
}

impl Bucket {
    /// Creates an empty bucket.
    pub const fn new(name: BucketName) -> Self {
        Self {
            name,
            duration_ms: 0,
        }
    }

    /// Creates a bucket with an already accumulated duration.
    ///
    /// Negative values (including the legacy `-1` "unset" marker) become 0.
    pub fn with_duration(name: BucketName, duration_ms: i64) -> Self {
        Self {
            name,
            duration_ms: duration_ms.max(0),
        }
    }

    pub const fn name(&self) -> &BucketName {
        &self.name
    }

    /// Accumulated time in milliseconds.
    pub const fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Adds elapsed time. Negative amounts are ignored.
    pub fn accrue(&mut self, elapsed_ms: i64) {
        self.duration_ms = self.duration_ms.saturating_add(elapsed_ms.max(0));
    }

    pub fn reset(&mut self) {
        self.duration_ms = 0;
    }

    pub(crate) fn set_name(&mut self, name: BucketName) {
        self.name = name;
    }
}

impl PartialEq for Bucket {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Bucket {}

impl Hash for Bucket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
