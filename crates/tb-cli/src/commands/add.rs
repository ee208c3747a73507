//! Add command for creating buckets.

use std::io::Write;

use anyhow::Result;

use super::util::with_tracker;
use crate::Config;

/// Adds a bucket at the end of the list. Existing names are left untouched.
pub fn run<W: Write>(writer: &mut W, name: &str, config: &Config, now: i64) -> Result<()> {
    let inserted = with_tracker(config, now, |tracker| Ok(tracker.add_bucket(name)?))?;
    let name = name.trim();
    if inserted {
        writeln!(writer, "Added bucket {name}")?;
    } else {
        writeln!(writer, "Bucket {name} already exists")?;
    }
    Ok(())
}
