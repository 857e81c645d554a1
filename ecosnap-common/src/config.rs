//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from an optional TOML file. Root folder resolution
//! follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::progression::BadgeCatalog;
use crate::{Error, Result};

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "ecosnap.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Largest accepted request body (images arrive base64-encoded)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Per-subscriber SSE event buffer
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detection service connection
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_url")]
    pub base_url: String,

    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressionConfig {
    /// Badge catalog file; relative paths resolve against the root folder.
    /// The built-in catalog is used when unset.
    #[serde(default)]
    pub badge_catalog: Option<PathBuf>,

    /// Attempts at committing one transition before giving up on conflicts
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_port() -> u16 {
    5801
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_event_capacity() -> usize {
    100
}

fn default_classifier_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_classifier_timeout_ms() -> u64 {
    10_000
}

fn default_max_write_attempts() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_address: default_bind_address(),
            max_body_bytes: default_max_body_bytes(),
            event_capacity: default_event_capacity(),
            classifier: ClassifierConfig::default(),
            progression: ProgressionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_url(),
            timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            badge_catalog: None,
            max_write_attempts: default_max_write_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load the bootstrap config
    ///
    /// An explicit path must exist and parse. Without one, the platform
    /// locations are searched; finding nothing yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Cannot read config {}: {}", path.display(), e))
            })?;
            info!("Loaded config from {}", path.display());
            return Self::from_toml_str(&content);
        }

        match find_config_file() {
            Ok(path) => {
                let content = std::fs::read_to_string(&path)?;
                info!("Loaded config from {}", path.display());
                Self::from_toml_str(&content)
            }
            Err(_) => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

impl ProgressionConfig {
    /// Load the configured badge catalog, or the built-in one
    pub fn load_catalog(&self, root_folder: &Path) -> Result<BadgeCatalog> {
        match &self.badge_catalog {
            Some(path) if path.is_absolute() => BadgeCatalog::load(path),
            Some(path) => BadgeCatalog::load(&root_folder.join(path)),
            None => {
                let catalog = BadgeCatalog::builtin();
                info!("Using built-in badge catalog ({} badges)", catalog.len());
                Ok(catalog)
            }
        }
    }
}

/// Resolve the root folder holding the database and catalog files
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
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

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE))
}

/// Get default configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ecosnap").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/ecosnap/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/ecosnap (or /var/lib/ecosnap for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("ecosnap"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ecosnap"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ecosnap"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ecosnap"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ecosnap"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ecosnap"))
    } else {
        PathBuf::from("./ecosnap_data")
    }
}
