//! Shared utilities for CLI commands.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use fs2::FileExt;
use regex::Regex;
use tb_core::store::keys;
use tb_core::{KeyValueStore, SessionTracker};
use tb_db::Database;

use crate::Config;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(second|minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 1000 * 365 * 24 * 60 * 60;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Resolves the effective "now" for a command: the `--at` override or the clock.
pub fn resolve_now(at: Option<&str>) -> anyhow::Result<i64> {
    at.map_or_else(
        || Ok(now_ms()),
        |s| parse_datetime(s).map(|dt| dt.timestamp_millis()),
    )
}

/// Parse a datetime string as either ISO 8601 or relative time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "45 seconds ago"
pub fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();

    // Try ISO 8601 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try relative time: "N seconds/minutes/hours/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let seconds_per_unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 60 * 60 * 24,
        "week" => 60 * 60 * 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > MAX_RELATIVE_SECONDS / seconds_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(Utc::now() - Duration::seconds(n * seconds_per_unit))
}

/// Opens the configured database, creating its parent directory if needed.
pub fn open_database(config: &Config) -> anyhow::Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("failed to create database directory")?;
        }
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Returns the path of the lock file guarding a database.
fn lock_path(database_path: &Path) -> PathBuf {
    let mut name = database_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Takes the exclusive writer lock for the configured database.
///
/// Blocks until no other `tb` process holds it. The lock is released when the
/// returned file is dropped. The database directory must already exist.
pub fn lock_state(config: &Config) -> anyhow::Result<File> {
    let lock_file =
        File::create(lock_path(&config.database_path)).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire lock")?;
    Ok(lock_file)
}

/// The last reconciliation time recorded in the database, if any.
pub fn stored_last_tick(db: &Database) -> anyhow::Result<Option<i64>> {
    db.get_long(keys::LAST_TICK)
        .context("failed to read last tick")
}

fn format_instant(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map_or_else(
        || epoch_ms.to_string(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Restores the tracker from the database as of `now`.
pub fn load_tracker(db: &Database, config: &Config, now: i64) -> anyhow::Result<SessionTracker> {
    let break_name = config
        .break_bucket()
        .context("invalid break bucket name in configuration")?;
    SessionTracker::restore(db, break_name, now).context("failed to load tracker state")
}

/// Restores the tracker, applies `op`, and persists the result.
///
/// Holds the writer lock throughout. Nothing is written if `op` fails or if
/// `now` is earlier than the last recorded reconciliation, since that time has
/// already been credited.
pub fn with_tracker<T>(
    config: &Config,
    now: i64,
    op: impl FnOnce(&mut SessionTracker) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let mut db = open_database(config)?;
    let _lock = lock_state(config)?;

    if let Some(last_tick) = stored_last_tick(&db)? {
        if now < last_tick {
            anyhow::bail!(
                "{} is earlier than the last recorded change at {}",
                format_instant(now),
                format_instant(last_tick)
            );
        }
    }

    let mut tracker = load_tracker(&db, config, now)?;
    let result = op(&mut tracker)?;
    tracker
        .persist(&mut db, now)
        .context("failed to save tracker state")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let dt = parse_datetime("2026-01-15T13:04:05Z").unwrap();
        assert_eq!(dt.timestamp_millis(), 1_768_482_245_000);

        let dt = parse_datetime("2026-01-15T15:04:05+02:00").unwrap();
        assert_eq!(dt.timestamp_millis(), 1_768_482_245_000);
    }

    #[test]
    fn parses_relative_time() {
        let before = Utc::now();
        let dt = parse_datetime("10 minutes ago").unwrap();
        let after = Utc::now();

        assert!(dt <= after - Duration::minutes(10));
        assert!(dt >= before - Duration::minutes(10));
        assert!(parse_datetime("1 week ago").is_ok());
        assert!(parse_datetime("30 seconds ago").is_ok());
    }

    #[test]
    fn rejects_garbage_and_overflow() {
        assert!(parse_datetime("yesterday-ish").is_err());
        assert!(parse_datetime("999999999999 weeks ago").is_err());
    }

    #[test]
    fn resolve_now_prefers_override() {
        assert_eq!(
            resolve_now(Some("2026-01-15T13:04:05Z")).unwrap(),
            1_768_482_245_000
        );
        let now = resolve_now(None).unwrap();
        assert!((now - now_ms()).abs() < 60_000);
    }

    #[test]
    fn with_tracker_persists_changes() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("nested/tb.db"),
            ..Config::default()
        };

        with_tracker(&config, 0, |tracker| {
            tracker.add_bucket("Read")?;
            tracker.switch_to("Read", 0)?;
            Ok(())
        })
        .unwrap();

        let db = open_database(&config).unwrap();
        let tracker = load_tracker(&db, &config, 4_000).unwrap();
        assert_eq!(tracker.active_name().unwrap().as_str(), "Read");
        assert_eq!(tracker.ledger().find("Read").unwrap().duration_ms(), 4_000);
    }

    #[test]
    fn with_tracker_skips_persist_on_error() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("tb.db"),
            ..Config::default()
        };

        let result = with_tracker(&config, 0, |tracker| {
            tracker.add_bucket("Read")?;
            tracker.switch_to("Nope", 0)?;
            Ok(())
        });
        assert!(result.is_err());

        let db = open_database(&config).unwrap();
        let tracker = load_tracker(&db, &config, 0).unwrap();
        assert!(tracker.ledger().find("Read").is_none());
    }

    #[test]
    fn with_tracker_rejects_time_before_last_tick() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("tb.db"),
            ..Config::default()
        };

        with_tracker(&config, 0, |tracker| {
            tracker.add_bucket("Read")?;
            tracker.add_bucket("Write")?;
            tracker.switch_to("Write", 0)?;
            Ok(())
        })
        .unwrap();
        with_tracker(&config, 10_000, |_| Ok(())).unwrap();

        let err = with_tracker(&config, 5_000, |tracker| {
            tracker.switch_to("Read", 5_000)?;
            Ok(())
        })
        .unwrap_err();
        assert!(err.to_string().contains("earlier than the last recorded change"));

        // The rejected switch left nothing behind; wall time is counted once
        let db = open_database(&config).unwrap();
        let tracker = load_tracker(&db, &config, 10_000).unwrap();
        assert_eq!(tracker.active_name().unwrap().as_str(), "Write");
        assert_eq!(tracker.ledger().find("Write").unwrap().duration_ms(), 10_000);
        assert_eq!(tracker.ledger().find("Read").unwrap().duration_ms(), 0);
        assert_eq!(tracker.ledger().total_ms(), 10_000);
    }

    #[test]
    fn with_tracker_accepts_same_instant() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("tb.db"),
            ..Config::default()
        };

        with_tracker(&config, 3_000, |tracker| Ok(tracker.add_bucket("Read")?)).unwrap();
        assert!(with_tracker(&config, 3_000, |tracker| Ok(tracker.add_bucket("Write")?)).unwrap());
    }

    #[test]
    fn lock_file_sits_next_to_database() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("tb.db"),
            ..Config::default()
        };

        with_tracker(&config, 0, |_| Ok(())).unwrap();
        assert!(temp.path().join("tb.db.lock").exists());

        // Released once the command finishes
        let lock = lock_state(&config).unwrap();
        drop(lock);
    }
}
