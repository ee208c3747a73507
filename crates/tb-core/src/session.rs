//! Session tracking: which bucket is active, since when, and how elapsed
//! time flows into the ledger.
//!
//! All elapsed time enters the ledger through [`SessionTracker::reconcile`].
//! Every operation that reads or changes the active bucket reconciles first,
//! so time is credited exactly once, to the bucket that was active while it
//! elapsed.
//!
//! # Persistence
//!
//! [`SessionTracker::persist`] writes the last reconciliation time alongside
//! the durations. [`SessionTracker::restore`] credits the restored active
//! bucket with the time between that tick and the restore, so killing the
//! process without a final save loses nothing that was observed.

use serde::Serialize;

use crate::bucket::Bucket;
use crate::error::TrackerError;
use crate::ledger::BucketLedger;
use crate::store::{KeyValueStore, WriteBatch, keys};
use crate::types::BucketName;

/// Which bucket is being timed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No bucket is active. Only observable before the first activation.
    Idle,
    /// A bucket is active since `started_at_ms` (epoch milliseconds).
    Active {
        bucket: BucketName,
        started_at_ms: i64,
    },
}

/// Owns the ledger and the active session.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    ledger: BucketLedger,
    state: SessionState,
    last_tick_ms: i64,
}

impl SessionTracker {
    /// Creates an idle tracker with a ledger holding only the break bucket.
    pub fn new(break_name: BucketName, now_ms: i64) -> Self {
        Self::with_ledger(BucketLedger::new(break_name), now_ms)
    }

    /// Creates an idle tracker over an existing ledger.
    pub const fn with_ledger(ledger: BucketLedger, now_ms: i64) -> Self {
        Self {
            ledger,
            state: SessionState::Idle,
            last_tick_ms: now_ms,
        }
    }

    pub const fn ledger(&self) -> &BucketLedger {
        &self.ledger
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Epoch milliseconds of the last reconciliation.
    pub const fn last_tick_ms(&self) -> i64 {
        self.last_tick_ms
    }

    pub const fn active_name(&self) -> Option<&BucketName> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Active { bucket, .. } => Some(bucket),
        }
    }

    pub fn active(&self) -> Option<&Bucket> {
        self.active_name()
            .and_then(|name| self.ledger.find(name.as_str()))
    }

    /// When the active bucket became active.
    pub const fn session_started_at(&self) -> Option<i64> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Active { started_at_ms, .. } => Some(*started_at_ms),
        }
    }

    /// True when a bucket other than the break bucket is active.
    pub fn is_tracking(&self) -> bool {
        self.active_name()
            .is_some_and(|name| !self.ledger.is_break(name.as_str()))
    }

    /// Flushes time elapsed since the last tick into the active bucket.
    ///
    /// A clock that moved backwards credits nothing. The tick always advances
    /// to `now_ms`. Returns the credited milliseconds.
    pub fn reconcile(&mut self, now_ms: i64) -> i64 {
        let elapsed = now_ms.saturating_sub(self.last_tick_ms);
        if elapsed < 0 {
            tracing::warn!(
                last_tick_ms = self.last_tick_ms,
                now_ms,
                "clock moved backwards, crediting nothing"
            );
        }
        let credited = elapsed.max(0);

        if let SessionState::Active { bucket, .. } = &self.state {
            self.ledger.accrue(bucket.as_str(), credited);
            tracing::trace!(bucket = %bucket, credited_ms = credited, "reconciled");
        }
        self.last_tick_ms = now_ms;

        if self.active_name().is_some() {
            credited
        } else {
            0
        }
    }

    /// Makes `name` the active bucket.
    ///
    /// Pending time is flushed into the outgoing bucket first. Switching to
    /// the bucket that is already active only flushes.
    pub fn switch_to(&mut self, name: &str, now_ms: i64) -> Result<(), TrackerError> {
        let target = self
            .ledger
            .find(name)
            .map(|bucket| bucket.name().clone())
            .ok_or_else(|| TrackerError::unknown(name))?;

        self.reconcile(now_ms);

        if self.active_name() != Some(&target) {
            tracing::debug!(bucket = %target, started_at_ms = now_ms, "switched bucket");
            self.state = SessionState::Active {
                bucket: target,
                started_at_ms: now_ms,
            };
        }
        Ok(())
    }

    /// Makes the break bucket active.
    pub fn switch_to_break(&mut self, now_ms: i64) {
        let break_name = self.ledger.break_name().clone();
        self.reconcile(now_ms);
        if self.active_name() != Some(&break_name) {
            tracing::debug!(bucket = %break_name, started_at_ms = now_ms, "switched to break");
            self.state = SessionState::Active {
                bucket: break_name,
                started_at_ms: now_ms,
            };
        }
    }

    /// Activates the break bucket if nothing is active yet.
    pub fn ensure_active(&mut self, now_ms: i64) {
        if self.state == SessionState::Idle {
            self.switch_to_break(now_ms);
        }
    }

    /// Adds a new empty bucket at the end of the ledger.
    ///
    /// Returns `false` if a bucket with that name already exists.
    pub fn add_bucket(&mut self, name: &str) -> Result<bool, TrackerError> {
        let name = BucketName::new(name)?;
        let inserted = self.ledger.add(Bucket::new(name.clone()));
        if inserted {
            tracing::debug!(bucket = %name, "added bucket");
        }
        Ok(inserted)
    }

    /// Deletes a bucket.
    ///
    /// Deleting the active bucket moves the session to the break bucket in
    /// the same call, so the tracker never points at a missing bucket.
    pub fn delete(&mut self, name: &str, now_ms: i64) -> Result<Option<Bucket>, TrackerError> {
        self.reconcile(now_ms);
        let was_active = self.active_name().is_some_and(|a| a.as_str() == name);

        let removed = self.ledger.remove(name)?;
        if was_active && removed.is_some() {
            self.state = SessionState::Idle;
            self.switch_to_break(now_ms);
        }
        if let Some(bucket) = &removed {
            tracing::debug!(bucket = %bucket.name(), duration_ms = bucket.duration_ms(), "deleted bucket");
        }
        Ok(removed)
    }

    /// Zeroes one bucket.
    ///
    /// Resetting the active bucket re-anchors its session start to `now_ms`.
    pub fn reset(&mut self, name: &str, now_ms: i64) -> Result<(), TrackerError> {
        self.reconcile(now_ms);
        self.ledger.reset(name)?;

        if let SessionState::Active {
            bucket,
            started_at_ms,
        } = &mut self.state
        {
            if bucket.as_str() == name {
                *started_at_ms = now_ms;
            }
        }
        tracing::debug!(bucket = name, "reset bucket");
        Ok(())
    }

    /// Zeroes every bucket and restarts the session on the break bucket.
    pub fn reset_all(&mut self, now_ms: i64) {
        self.reconcile(now_ms);
        self.ledger.reset_all();
        self.state = SessionState::Idle;
        self.switch_to_break(now_ms);
        tracing::debug!(buckets = self.ledger.bucket_count(), "reset all buckets");
    }

    /// Renames a bucket, keeping the session on it if it was active.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), TrackerError> {
        let new = BucketName::new(new)?;
        self.ledger.rename(old, new.clone())?;

        if let SessionState::Active { bucket, .. } = &mut self.state {
            if bucket.as_str() == old {
                *bucket = new.clone();
            }
        }
        tracing::debug!(from = old, to = %new, "renamed bucket");
        Ok(())
    }

    /// Reconciles, then commits the full tracker state in one batch.
    ///
    /// Break bucket time is not persisted. Duration keys of buckets that no
    /// longer exist are removed in the same commit.
    pub fn persist<S>(&mut self, store: &mut S, now_ms: i64) -> Result<(), TrackerError>
    where
        S: KeyValueStore + ?Sized,
    {
        self.reconcile(now_ms);

        let previous = store
            .get_string_list(keys::BUCKET_NAMES)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring unreadable persisted bucket list");
                None
            })
            .unwrap_or_default();

        let names: Vec<String> = self
            .ledger
            .ordered_list()
            .iter()
            .filter(|b| !self.ledger.is_break(b.name().as_str()))
            .map(|b| b.name().to_string())
            .collect();

        let mut batch = WriteBatch::new();
        for bucket in self.ledger.ordered_list() {
            if self.ledger.is_break(bucket.name().as_str()) {
                continue;
            }
            batch.put_long(
                keys::bucket_duration(bucket.name().as_str()),
                bucket.duration_ms(),
            );
        }
        for stale in previous.iter().filter(|p| !names.contains(*p)) {
            batch.remove(keys::bucket_duration(stale));
        }
        batch.put_string_list(keys::BUCKET_NAMES, names);

        match &self.state {
            SessionState::Active {
                bucket,
                started_at_ms,
            } => {
                batch
                    .put_string(keys::ACTIVE_BUCKET, bucket.as_str())
                    .put_long(keys::SESSION_STARTED_AT, *started_at_ms);
            }
            SessionState::Idle => {
                batch
                    .remove(keys::ACTIVE_BUCKET)
                    .remove(keys::SESSION_STARTED_AT);
            }
        }
        batch.put_long(keys::LAST_TICK, self.last_tick_ms);

        let ops = batch.len();
        store
            .commit(batch)
            .map_err(TrackerError::PersistenceWrite)?;
        tracing::debug!(ops, last_tick_ms = self.last_tick_ms, "persisted tracker state");
        Ok(())
    }

    /// Rebuilds a tracker from persisted state.
    ///
    /// The break bucket is always first. The persisted active bucket is
    /// credited with the time between the persisted last tick and `now_ms`.
    /// Missing keys fall back to defaults; the result is never idle.
    pub fn restore<S>(store: &S, break_name: BucketName, now_ms: i64) -> Result<Self, TrackerError>
    where
        S: KeyValueStore + ?Sized,
    {
        let read = TrackerError::PersistenceRead;
        let names = store
            .get_string_list(keys::BUCKET_NAMES)
            .map_err(read)?
            .unwrap_or_default();
        let active_name = store.get_string(keys::ACTIVE_BUCKET).map_err(read)?;
        let started_at = store.get_long(keys::SESSION_STARTED_AT).map_err(read)?;
        let last_tick = store.get_long(keys::LAST_TICK).map_err(read)?;

        let mut ledger = BucketLedger::new(break_name);
        let mut state = SessionState::Idle;

        for raw in names {
            let Ok(name) = BucketName::new(raw.as_str()) else {
                tracing::warn!(name = %raw, "skipping persisted bucket with blank name");
                continue;
            };
            if ledger.contains(name.as_str()) {
                tracing::warn!(bucket = %name, "skipping duplicate persisted bucket");
                continue;
            }
            let duration = store
                .get_long(&keys::bucket_duration(name.as_str()))
                .map_err(read)?
                .unwrap_or(0)
                .max(0);

            if state == SessionState::Idle && active_name.as_deref() == Some(name.as_str()) {
                let drift = last_tick.map_or(0, |tick| now_ms.saturating_sub(tick));
                if drift < 0 {
                    tracing::warn!(drift_ms = drift, "clock moved backwards since last save");
                }
                let recovered = duration.saturating_add(drift.max(0));
                tracing::debug!(bucket = %name, duration, recovered, "recovered active bucket");

                state = SessionState::Active {
                    bucket: name.clone(),
                    started_at_ms: started_at.unwrap_or(now_ms),
                };
                ledger.add(Bucket::with_duration(name, recovered));
            } else {
                ledger.add(Bucket::with_duration(name, duration));
            }
        }

        if state == SessionState::Idle {
            let break_name = ledger.break_name().clone();
            let resumed_break = active_name.as_deref() == Some(break_name.as_str());
            state = SessionState::Active {
                bucket: break_name,
                started_at_ms: if resumed_break {
                    started_at.unwrap_or(now_ms)
                } else {
                    now_ms
                },
            };
        }

        tracing::debug!(buckets = ledger.bucket_count(), ?state, "restored tracker state");
        Ok(Self {
            ledger,
            state,
            last_tick_ms: now_ms,
        })
    }
}
