//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Values are resolved with
//! the following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "INQ_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "INQ_ROOT_FOLDER";

/// File name of the intelligence database inside the root folder
pub const DATABASE_FILE_NAME: &str = "inquisitor.db";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; a missing file or a missing key falls back to
/// the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the default database and generated reports
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Google Custom Search credentials and quota limits
    pub google: GoogleConfig,

    /// Shodan credentials and quota limits
    pub shodan: ShodanConfig,

    /// Scan concurrency and timeouts
    pub scan: ScanConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Google Custom Search section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Developer (API) key
    pub dev_key: Option<String>,
    /// Custom search engine identifier
    pub cse_id: Option<String>,
    /// Maximum pages fetched per query
    pub page_limit: Option<u32>,
    /// Maximum pages fetched across a whole scan
    pub page_budget: Option<u32>,
}

/// Shodan section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShodanConfig {
    /// API key
    pub api_key: Option<String>,
    /// Maximum pages fetched per query
    pub page_limit: Option<u32>,
    /// Maximum pages fetched across a whole scan
    pub page_budget: Option<u32>,
}

/// Scan section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of assets transformed concurrently
    pub workers: usize,
    /// Upper bound on a single asset's transform, in seconds
    pub asset_timeout_secs: u64,
    /// Total timeout of one HTTP request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            asset_timeout_secs: 300,
            request_timeout_secs: 15,
        }
    }
}

impl TomlConfig {
    /// Load configuration
    ///
    /// An explicit path (from the command line) must exist. Otherwise the
    /// `INQ_CONFIG` environment variable is consulted, then the platform
    /// config locations. A missing `INQ_CONFIG` file is warned about and,
    /// like no file at all, yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::from_file(&path);
            }
            warn!(path = %path.display(), "{} points at a missing file, using built-in defaults", CONFIG_ENV_VAR);
            return Ok(Self::default());
        }

        match default_config_path() {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Parse config {} failed: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Get the first existing configuration file for the platform
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("inquisitor").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/inquisitor/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the root folder following the priority order of this module
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
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

/// Resolve the database path
///
/// An explicit database path wins; otherwise the database lives in the root
/// folder.
pub fn resolve_database_path(cli_database: Option<&Path>, config: &TomlConfig) -> PathBuf {
    match cli_database {
        Some(path) => path.to_path_buf(),
        None => resolve_root_folder(None, config).join(DATABASE_FILE_NAME),
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/inquisitor
        dirs::data_local_dir()
            .map(|d| d.join("inquisitor"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/inquisitor"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("inquisitor"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/inquisitor"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("inquisitor"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\inquisitor"))
    } else {
        PathBuf::from("./inquisitor_data")
    }
}

/// User-Agent sent with every outbound HTTP request
pub fn user_agent() -> String {
    format!("inquisitor/{}", env!("CARGO_PKG_VERSION"))
}

/// Validate a credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
