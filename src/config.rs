//! Layered configuration for the ingestor.
//!
//! Sources, lowest precedence first:
//! - Default values
//! - TOML configuration file (`.ingestor/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the command layer)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `INGESTOR_` and use double
//! underscores to separate nested levels:
//! - `INGESTOR_WATCH__DIR=drops` sets `watch.dir`
//! - `INGESTOR_WATCH__DEBOUNCE_MS=250` sets `watch.debounce_ms`
//! - `INGESTOR_MASTER__SCHEMA=align` sets `master.schema`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::merge::{MissingMasterPolicy, SchemaPolicy};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".ingestor";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "INGESTOR_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub master: MasterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Directory watched for new files (non-recursive)
    #[serde(default = "default_watch_dir")]
    pub dir: PathBuf,

    /// File extension to ingest, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How long a new file must be quiet before it is merged
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Event loop wake-up interval
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MasterConfig {
    /// Path of the master dataset
    #[serde(default = "default_master_path")]
    pub path: PathBuf,

    /// Behavior when the master does not exist yet
    #[serde(default)]
    pub missing: MissingMasterPolicy,

    /// Behavior when an incoming file's columns differ from the master's
    #[serde(default)]
    pub schema: SchemaPolicy,

    /// Field delimiter, a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target level overrides, e.g. `"ingestor::watcher" = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_watch_dir() -> PathBuf {
    PathBuf::from("incoming_data")
}
fn default_extension() -> String {
    "csv".to_string()
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_tick_ms() -> u64 {
    100
}
fn default_master_path() -> PathBuf {
    PathBuf::from("supply_chain_data_master.csv")
}
fn default_delimiter() -> char {
    ','
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchConfig::default(),
            master: MasterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dir: default_watch_dir(),
            extension: default_extension(),
            debounce_ms: default_debounce_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            path: default_master_path(),
            missing: MissingMasterPolicy::default(),
            schema: SchemaPolicy::default(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl MasterConfig {
    /// The delimiter as a byte, if it is ASCII.
    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter
            .is_ascii()
            .then_some(self.delimiter as u8)
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// The settings file is looked up from the current directory upward.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file (missing files are skipped).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores stay
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.ingestor/settings.toml` from the current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under `root`.
    pub fn init_config_file(root: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
