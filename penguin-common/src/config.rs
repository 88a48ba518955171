//! Configuration loading and data folder layout
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PENGUIN_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: defaults are used and a warning is
//! logged. A TOML file that exists but fails to parse is an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the data root folder
pub const ROOT_FOLDER_ENV: &str = "PENGUIN_ROOT_FOLDER";

/// Environment variable naming the TOML config file
pub const CONFIG_FILE_ENV: &str = "PENGUIN_CONFIG";

/// Directory name used under the platform config/data directories
const APP_DIR_NAME: &str = "penguin-classifier";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding data, model and report files (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Interface the HTTP server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of history rows rendered in the table (unlimited if absent)
    #[serde(default)]
    pub table_row_limit: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8050
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            host: default_host(),
            port: default_port(),
            table_row_limit: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicitly named file must exist. The platform default location
    /// is optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!("Loading config from {}", path.display());
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform config file location (`<config_dir>/penguin-classifier/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./penguin_data"))
}

/// Resolve the data root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Locations of every persisted file, all under one root folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
    /// Immutable seed dataset
    pub seed: PathBuf,
    /// Append-only prediction log
    pub history: PathBuf,
    /// Trained model artifact
    pub model: PathBuf,
    /// Training metrics report
    pub metrics: PathBuf,
}

impl DataPaths {
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            seed: root.join("raw").join("data.csv"),
            history: root.join("processed").join("prediction_history.csv"),
            model: root.join("models").join("pipeline.json"),
            metrics: root.join("reports").join("metrics.json"),
            root,
        }
    }

    /// Create the parent directory of every data file
    pub fn ensure_directories(&self) -> Result<()> {
        for file in [&self.seed, &self.history, &self.model, &self.metrics] {
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
