//! Reset and clear commands for zeroing bucket time.

use std::io::Write;

use anyhow::Result;

use super::util::with_tracker;
use crate::Config;

/// Zeroes one bucket. If it is active, its session restarts at `now`.
pub fn run<W: Write>(writer: &mut W, name: &str, config: &Config, now: i64) -> Result<()> {
    let name = name.trim();
    with_tracker(config, now, |tracker| Ok(tracker.reset(name, now)?))?;
    writeln!(writer, "Reset {name}")?;
    Ok(())
}

/// Zeroes every bucket and starts a break.
pub fn clear<W: Write>(writer: &mut W, config: &Config, now: i64) -> Result<()> {
    let count = with_tracker(config, now, |tracker| {
        tracker.reset_all(now);
        Ok(tracker.ledger().bucket_count())
    })?;
    writeln!(writer, "Cleared {count} buckets")?;
    Ok(())
}
