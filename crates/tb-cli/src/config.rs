//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tb_core::{BucketName, DEFAULT_TICK_INTERVAL_MS, ValidationError};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Name of the break bucket.
    pub break_name: String,
    /// Interval between live reconciliations in `watch`.
    pub tick_interval_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tb.db"),
            break_name: "Pause".to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TB_*)
        figment = figment.merge(Env::prefixed("TB_"));

        figment.extract()
    }

    /// The validated break bucket name.
    pub fn break_bucket(&self) -> Result<BucketName, ValidationError> {
        BucketName::new(self.break_name.as_str())
    }
}

/// Returns the platform-specific config directory for tb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tb"))
}

/// Returns the platform-specific data directory for tb.
///
/// On Linux: `~/.local/share/tb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tb"))
}
