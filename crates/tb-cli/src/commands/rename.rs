//! Rename command.

use std::io::Write;

use anyhow::Result;

use super::util::with_tracker;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, from: &str, to: &str, config: &Config, now: i64) -> Result<()> {
    let (from, to) = (from.trim(), to.trim());
    with_tracker(config, now, |tracker| Ok(tracker.rename(from, to)?))?;
    writeln!(writer, "Renamed {from} to {to}")?;
    Ok(())
}
