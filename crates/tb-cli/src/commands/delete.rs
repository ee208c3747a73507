//! Delete command for removing buckets.

use std::io::Write;

use anyhow::Result;

use super::util::with_tracker;
use crate::Config;

/// Deletes a bucket. Deleting the active bucket starts a break.
pub fn run<W: Write>(writer: &mut W, name: &str, config: &Config, now: i64) -> Result<()> {
    let name = name.trim();
    let removed = with_tracker(config, now, |tracker| Ok(tracker.delete(name, now)?))?;
    match removed {
        Some(bucket) => writeln!(writer, "Deleted {}", bucket.name())?,
        None => writeln!(writer, "No bucket named {name}")?,
    }
    Ok(())
}
