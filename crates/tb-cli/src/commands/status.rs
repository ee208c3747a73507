//! Status command for showing buckets and the active session.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::Local;
use tb_core::RenderModel;

use super::util::{load_tracker, open_database};
use crate::Config;

/// Prints the bucket list as of `now`.
///
/// Reads only: the drift since the last save is shown but not written back.
pub fn run<W: Write>(writer: &mut W, config: &Config, now: i64, json: bool) -> Result<()> {
    let db = open_database(config)?;
    let tracker = load_tracker(&db, config, now)?;
    let model = tracker.render(&Local);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&model)?)?;
        return Ok(());
    }

    writeln!(writer, "Database: {}", config.database_path.display())?;
    write!(writer, "{}", format_status(&model))?;
    Ok(())
}

/// Formats the render model for humans.
pub fn format_status(model: &RenderModel) -> String {
    let mut output = String::new();

    match (&model.active, &model.started_at) {
        (Some(active), Some(started)) => {
            writeln!(output, "Active: {active} (since {started})").unwrap();
        }
        (Some(active), None) => writeln!(output, "Active: {active}").unwrap(),
        (None, _) => writeln!(output, "Active: none").unwrap(),
    }
    writeln!(output).unwrap();

    let width = model
        .rows
        .iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or(0);
    for row in &model.rows {
        let marker = if row.is_active { '*' } else { ' ' };
        let line = format!("{marker} {:<width$}  {}", row.name, row.elapsed);
        writeln!(output, "{}", line.trim_end()).unwrap();
    }

    output
}
