//! Render model for the bucket list and the "started at" label.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::session::SessionTracker;

/// One row of the bucket list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketRow {
    pub name: String,
    pub duration_ms: i64,
    /// `HH:MM:SS`, or empty for the break bucket and for zero durations.
    pub elapsed: String,
    pub is_active: bool,
    pub is_break: bool,
}

/// Everything a view needs to draw the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderModel {
    pub rows: Vec<BucketRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<i64>,
    /// Start of the active session as `hh:mm:ss AM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

impl SessionTracker {
    /// Builds the render model, formatting wall-clock times in `tz`.
    ///
    /// Durations are read as-is; callers reconcile first for live values.
    pub fn render<Tz>(&self, tz: &Tz) -> RenderModel
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let active = self.active_name();
        let rows = self
            .ledger()
            .ordered_list()
            .iter()
            .map(|bucket| {
                let is_break = self.ledger().is_break(bucket.name().as_str());
                let duration_ms = bucket.duration_ms();
                BucketRow {
                    name: bucket.name().to_string(),
                    duration_ms,
                    elapsed: if is_break || duration_ms <= 0 {
                        String::new()
                    } else {
                        format_elapsed(duration_ms)
                    },
                    is_active: active == Some(bucket.name()),
                    is_break,
                }
            })
            .collect();

        let started_at_ms = self.session_started_at();
        RenderModel {
            rows,
            active: active.map(ToString::to_string),
            started_at_ms,
            started_at: started_at_ms.and_then(|ms| format_clock_time(ms, tz)),
        }
    }
}

/// Formats a duration as `HH:MM:SS`. Hours keep counting past 24.
pub fn format_elapsed(duration_ms: i64) -> String {
    let total_secs = duration_ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Formats an epoch-milliseconds instant as a 12-hour clock time in `tz`.
///
/// Returns `None` for instants chrono cannot represent.
pub fn format_clock_time<Tz>(epoch_ms: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc = DateTime::from_timestamp_millis(epoch_ms)?;
    Some(utc.with_timezone(tz).format("%I:%M:%S %p").to_string())
}
