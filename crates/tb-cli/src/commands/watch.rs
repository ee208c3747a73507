//! Watch command: live elapsed display for the active bucket.
//!
//! Drives a [`Ticker`] from a sleep loop. Every tick reloads the saved state
//! under the writer lock, reconciles, and saves, so commands run from other
//! terminals between ticks are picked up rather than overwritten. Killing the
//! process loses at most the time since the last tick, and the next restore
//! credits even that.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tb_core::{SessionTracker, Ticker, format_elapsed};

use super::util::{load_tracker, lock_state, now_ms, open_database, stored_last_tick};
use crate::Config;

/// Watches until interrupted, or until `ticks` ticks have fired.
pub fn run<W: Write>(writer: &mut W, config: &Config, ticks: Option<u64>) -> Result<()> {
    watch(writer, config, ticks, now_ms, std::thread::sleep)
}

fn watch<W, C, S>(
    writer: &mut W,
    config: &Config,
    ticks: Option<u64>,
    mut clock: C,
    mut sleep: S,
) -> Result<()>
where
    W: Write,
    C: FnMut() -> i64,
    S: FnMut(Duration),
{
    let mut db = open_database(config)?;
    let mut now = clock();
    let mut tracker = load_tracker(&db, config, now)?;

    let mut ticker = Ticker::new(config.tick_interval_ms);
    ticker.sync(&tracker, now);
    if !ticker.is_armed() {
        let name = tracker.ledger().break_name();
        writeln!(writer, "On break: {name}. Nothing to watch.")?;
        return Ok(());
    }

    writeln!(writer, "{}", progress_line(&tracker))?;
    let mut fired = 0;
    while ticks.is_none_or(|limit| fired < limit) {
        let Some(due) = ticker.next_due() else {
            break;
        };
        let wait = u64::try_from(due.saturating_sub(now)).unwrap_or(0);
        sleep(Duration::from_millis(wait));

        let _lock = lock_state(config)?;
        // Never rewind past a reconciliation another command already made
        let clock_now = clock();
        now = stored_last_tick(&db)?.map_or(clock_now, |last| clock_now.max(last));
        tracker = load_tracker(&db, config, now)?;
        if ticker.poll(&mut tracker, now) {
            tracker
                .persist(&mut db, now)
                .context("failed to save tracker state")?;
            writeln!(writer, "{}", progress_line(&tracker))?;
            writer.flush()?;
            fired += 1;
        } else if !ticker.is_armed() {
            let name = tracker.ledger().break_name();
            writeln!(writer, "On break: {name}. Stopped watching.")?;
        }
    }
    tracing::debug!(ticks = fired, "watch finished");
    Ok(())
}

fn progress_line(tracker: &SessionTracker) -> String {
    tracker.active().map_or_else(String::new, |bucket| {
        format!("{} {}", bucket.name(), format_elapsed(bucket.duration_ms()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::commands::util::with_tracker;

    fn setup(active: Option<&str>) -> (tempfile::TempDir, Config) {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("tb.db"),
            ..Config::default()
        };
        with_tracker(&config, 0, |tracker| {
            tracker.add_bucket("Read")?;
            if let Some(name) = active {
                tracker.switch_to(name, 0)?;
            }
            Ok(())
        })
        .unwrap();
        (temp, config)
    }

    #[test]
    fn watch_ticks_and_saves() {
        let (_temp, config) = setup(Some("Read"));
        let mut t = -1_000;
        let clock = move || {
            t += 1_000;
            t
        };
        let mut waits = Vec::new();

        let mut output = Vec::new();
        watch(&mut output, &config, Some(2), clock, |d| waits.push(d)).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Read 00:00:00\nRead 00:00:01\nRead 00:00:02\n"
        );
        assert_eq!(waits, vec![Duration::from_secs(1); 2]);

        let db = open_database(&config).unwrap();
        let tracker = load_tracker(&db, &config, 2_000).unwrap();
        assert_eq!(tracker.ledger().find("Read").unwrap().duration_ms(), 2_000);
    }

    #[test]
    fn watch_picks_up_switch_between_ticks() {
        let (_temp, config) = setup(Some("Read"));
        let mut t = -1_000;
        let clock = move || {
            t += 1_000;
            t
        };
        let mut switched = false;
        let sleep = |_| {
            if !switched {
                with_tracker(&config, 500, |tracker| Ok(tracker.switch_to("Write", 500)?))
                    .unwrap();
                switched = true;
            }
        };

        let mut output = Vec::new();
        watch(&mut output, &config, Some(2), clock, sleep).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Read 00:00:00\nWrite 00:00:00\nWrite 00:00:01\n"
        );
        let db = open_database(&config).unwrap();
        let tracker = load_tracker(&db, &config, 2_000).unwrap();
        assert_eq!(tracker.active_name().unwrap().as_str(), "Write");
        assert_eq!(tracker.ledger().find("Read").unwrap().duration_ms(), 500);
        assert_eq!(tracker.ledger().find("Write").unwrap().duration_ms(), 1_500);
        assert_eq!(tracker.ledger().total_ms(), 2_000);
    }

    #[test]
    fn watch_stops_when_paused_elsewhere() {
        let (_temp, config) = setup(Some("Read"));
        let mut t = -1_000;
        let clock = move || {
            t += 1_000;
            t
        };
        let sleep = |_| {
            with_tracker(&config, 400, |tracker| {
                tracker.switch_to_break(400);
                Ok(())
            })
            .unwrap();
        };

        let mut output = Vec::new();
        watch(&mut output, &config, None, clock, sleep).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Read 00:00:00\nOn break: Pause. Stopped watching.\n"
        );
        let db = open_database(&config).unwrap();
        let tracker = load_tracker(&db, &config, 1_000).unwrap();
        assert_eq!(tracker.ledger().find("Read").unwrap().duration_ms(), 400);
    }

    #[test]
    fn watch_on_break_does_nothing() {
        let (_temp, config) = setup(None);
        let mut output = Vec::new();
        watch(&mut output, &config, Some(1), || 0, |_| panic!("should not sleep")).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "On break: Pause. Nothing to watch.\n"
        );
    }
}
