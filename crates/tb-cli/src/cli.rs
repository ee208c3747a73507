//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Time buckets.
///
/// Tracks how much wall-clock time goes into named buckets, one bucket at a
/// time, with a built-in break bucket for untracked time.
#[derive(Debug, Parser)]
#[command(name = "tb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as if the current time were TIME (ISO 8601 or e.g. "10 minutes ago").
    #[arg(long, global = true, value_name = "TIME")]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a new bucket.
    Add {
        /// Name of the bucket.
        name: String,
    },

    /// Start timing a bucket.
    Switch {
        /// Name of the bucket to make active.
        name: String,
    },

    /// Switch to the break bucket.
    Pause,

    /// Show buckets and the active session.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Zero the time of one bucket.
    Reset {
        /// Name of the bucket to reset.
        name: String,
    },

    /// Zero the time of every bucket and start a break.
    Clear,

    /// Delete a bucket.
    Delete {
        /// Name of the bucket to delete.
        name: String,
    },

    /// Rename a bucket, keeping its time.
    Rename {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },

    /// Show live elapsed time for the active bucket.
    Watch {
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<u64>,
    },
}
