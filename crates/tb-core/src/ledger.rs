//! The bucket ledger: ordered, name-unique collection of buckets.

use std::collections::HashMap;

use crate::bucket::Bucket;
use crate::error::TrackerError;
use crate::types::BucketName;

/// Ordered collection of buckets, unique by name.
///
/// Insertion order is display order. The break bucket is inserted on
/// construction, so it always sits at index 0 and can never be removed.
#[derive(Debug, Clone)]
pub struct BucketLedger {
    buckets: Vec<Bucket>,
    index: HashMap<BucketName, usize>,
    break_name: BucketName,
}

impl BucketLedger {
    /// Creates a ledger holding only the break bucket.
    pub fn new(break_name: BucketName) -> Self {
        let mut ledger = Self {
            buckets: Vec::new(),
            index: HashMap::new(),
            break_name: break_name.clone(),
        };
        ledger.add(Bucket::new(break_name));
        ledger
    }

    /// Name of the break bucket.
    pub const fn break_name(&self) -> &BucketName {
        &self.break_name
    }

    pub fn is_break(&self, name: &str) -> bool {
        self.break_name.as_str() == name
    }

    /// Appends a bucket unless one with the same name already exists.
    ///
    /// Returns `true` if the bucket was inserted.
    pub fn add(&mut self, bucket: Bucket) -> bool {
        if self.index.contains_key(bucket.name().as_str()) {
            return false;
        }
        self.index.insert(bucket.name().clone(), self.buckets.len());
        self.buckets.push(bucket);
        true
    }

    /// Removes a bucket by name.
    ///
    /// Absent names are a no-op returning `Ok(None)`; the break bucket is
    /// protected.
    pub fn remove(&mut self, name: &str) -> Result<Option<Bucket>, TrackerError> {
        if self.is_break(name) {
            return Err(TrackerError::protected(name));
        }
        let Some(position) = self.index.remove(name) else {
            return Ok(None);
        };
        let removed = self.buckets.remove(position);
        for (i, bucket) in self.buckets.iter().enumerate().skip(position) {
            self.index.insert(bucket.name().clone(), i);
        }
        Ok(Some(removed))
    }

    /// Zeroes one bucket's duration.
    pub fn reset(&mut self, name: &str) -> Result<(), TrackerError> {
        self.get_mut(name)
            .ok_or_else(|| TrackerError::unknown(name))?
            .reset();
        Ok(())
    }

    /// Zeroes every bucket, the break bucket included.
    pub fn reset_all(&mut self) {
        for bucket in &mut self.buckets {
            bucket.reset();
        }
    }

    /// Renames a bucket in place, keeping its position and duration.
    pub fn rename(&mut self, old: &str, new: BucketName) -> Result<(), TrackerError> {
        if self.is_break(old) {
            return Err(TrackerError::protected(old));
        }
        if self.is_break(new.as_str()) {
            return Err(TrackerError::protected(new.as_str()));
        }
        if old == new.as_str() {
            return if self.contains(old) {
                Ok(())
            } else {
                Err(TrackerError::unknown(old))
            };
        }
        if self.contains(new.as_str()) {
            return Err(TrackerError::DuplicateBucket {
                name: new.to_string(),
            });
        }
        let position = self
            .index
            .remove(old)
            .ok_or_else(|| TrackerError::unknown(old))?;
        self.buckets[position].set_name(new.clone());
        self.index.insert(new, position);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Bucket> {
        self.index.get(name).map(|&i| &self.buckets[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Buckets in insertion order, break bucket first.
    pub fn ordered_list(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Adds elapsed time to a bucket. Unknown names are ignored.
    pub fn accrue(&mut self, name: &str, elapsed_ms: i64) {
        if let Some(bucket) = self.get_mut(name) {
            bucket.accrue(elapsed_ms);
        }
    }

    /// Sum of all durations, break bucket included.
    pub fn total_ms(&self) -> i64 {
        self.buckets.iter().map(Bucket::duration_ms).sum()
    }

    /// Number of buckets, break bucket included. Never zero.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Bucket> {
        let i = *self.index.get(name)?;
        self.buckets.get_mut(i)
    }
}
