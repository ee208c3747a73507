//! Switch and pause commands for changing the active bucket.

use std::io::Write;

use anyhow::Result;
use chrono::Local;
use tb_core::{SessionTracker, format_clock_time};

use super::util::with_tracker;
use crate::Config;

/// Makes `name` the active bucket, flushing time into the previous one.
pub fn run<W: Write>(writer: &mut W, name: &str, config: &Config, now: i64) -> Result<()> {
    let line = with_tracker(config, now, |tracker| {
        tracker.switch_to(name.trim(), now)?;
        Ok(describe(tracker))
    })?;
    writeln!(writer, "{line}")?;
    Ok(())
}

/// Makes the break bucket active.
pub fn pause<W: Write>(writer: &mut W, config: &Config, now: i64) -> Result<()> {
    let line = with_tracker(config, now, |tracker| {
        tracker.switch_to_break(now);
        Ok(describe(tracker))
    })?;
    writeln!(writer, "{line}")?;
    Ok(())
}

fn describe(tracker: &SessionTracker) -> String {
    let name = tracker
        .active_name()
        .map_or_else(String::new, ToString::to_string);
    let verb = if tracker.is_tracking() {
        "Tracking"
    } else {
        "On break:"
    };
    match tracker
        .session_started_at()
        .and_then(|ms| format_clock_time(ms, &Local))
    {
        Some(started) => format!("{verb} {name} (since {started})"),
        None => format!("{verb} {name}"),
    }
}
