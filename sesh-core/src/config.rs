//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sesh/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sesh/` (~/.config/sesh/)
//! - State/Logs: `$XDG_STATE_HOME/sesh/` (~/.local/state/sesh/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Lowest accepted value for the minimum-year filter.
pub const MIN_YEAR_LOWER_BOUND: i32 = 1900;
/// Highest accepted value for the minimum-year filter.
pub const MIN_YEAR_UPPER_BOUND: i32 = 3000;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Where the export files live
    #[serde(default)]
    pub input: InputConfig,

    /// Play filters applied by the loader
    #[serde(default)]
    pub filters: FilterConfig,

    /// Options handed through to the report assembler
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input location
#[derive(Debug, Deserialize, Default, Clone)]
pub struct InputConfig {
    /// Directory holding the `*.json` export files
    pub dir: Option<PathBuf>,
}

/// Loader filters
#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// Plays must last longer than this many milliseconds to count
    #[serde(default = "default_min_ms_played")]
    pub min_ms_played: i64,

    /// Ignore plays before this year (1900-3000, anything else disables the filter)
    #[serde(default)]
    pub min_year: Option<i32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_ms_played: default_min_ms_played(),
            min_year: None,
        }
    }
}

impl FilterConfig {
    /// The minimum-year filter, or `None` when unset or out of range.
    ///
    /// Out-of-range values disable the filter instead of failing the run.
    pub fn effective_min_year(&self) -> Option<i32> {
        match self.min_year {
            Some(year) if (MIN_YEAR_LOWER_BOUND..=MIN_YEAR_UPPER_BOUND).contains(&year) => {
                Some(year)
            }
            Some(year) => {
                tracing::warn!(min_year = year, "min_year out of range, disabling year filter");
                None
            }
            None => None,
        }
    }

    /// The minimum play duration, falling back to the default when negative.
    pub fn effective_min_ms_played(&self) -> u64 {
        u64::try_from(self.min_ms_played).unwrap_or_else(|_| {
            tracing::warn!(
                min_ms_played = self.min_ms_played,
                "invalid min_ms_played, using default"
            );
            default_min_ms_played() as u64
        })
    }
}

fn default_min_ms_played() -> i64 {
    20_000
}

/// Presentation options. The engine never reads these; they ride along in the report.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Rows per table page in the rendered report
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,

    /// Whether the assembler compresses the embedded table data
    #[serde(default = "default_compress_table_data")]
    pub compress_table_data: bool,

    /// Maximum tracks per smart playlist
    #[serde(default = "default_max_playlist_tracks")]
    pub max_playlist_tracks: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            compress_table_data: default_compress_table_data(),
            max_playlist_tracks: default_max_playlist_tracks(),
        }
    }
}

fn default_items_per_page() -> usize {
    10
}

fn default_compress_table_data() -> bool {
    true
}

fn default_max_playlist_tracks() -> usize {
    50
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config.validate())
    }

    /// Replace out-of-range values with their defaults.
    ///
    /// Never fails: a bad value only costs a warning.
    pub fn validate(mut self) -> Self {
        if self.filters.min_ms_played < 0 {
            tracing::warn!(
                min_ms_played = self.filters.min_ms_played,
                "invalid min_ms_played, using default"
            );
            self.filters.min_ms_played = default_min_ms_played();
        }
        self.filters.min_year = self.filters.effective_min_year();
        if self.report.items_per_page == 0 {
            tracing::warn!("items_per_page must be positive, using default");
            self.report.items_per_page = default_items_per_page();
        }
        if self.report.max_playlist_tracks == 0 {
            tracing::warn!("max_playlist_tracks must be positive, using default");
            self.report.max_playlist_tracks = default_max_playlist_tracks();
        }
        self
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sesh/config.toml` (~/.config/sesh/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sesh").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sesh/` (~/.local/state/sesh/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sesh")
    }
}
