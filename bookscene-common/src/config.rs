//! Bootstrap configuration loading and config file resolution
//!
//! Two-tier configuration:
//! 1. **TOML bootstrap**: where the runtime settings live, logging level
//! 2. **Settings store**: per-processor and engine settings (see [`crate::settings`])

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the bootstrap config file
pub const CONFIG_ENV_VAR: &str = "BOOKSCENE_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// These settings are read once at startup. Runtime settings (processor
/// weights, thresholds) are read from the settings store and may be reloaded.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BootstrapConfig {
    /// TOML file holding runtime settings
    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    /// SQLite database holding runtime settings (takes priority over `settings_file`)
    #[serde(default)]
    pub settings_database: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default log directive when RUST_LOG is unset (e.g. "info", "bookscene_engine=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Config file resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory (`<config_dir>/bookscene/config.toml`) if it exists
///
/// Returns `None` when no config file applies; callers fall back to defaults.
pub fn resolve_config_file(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform default, only if present
    default_config_file().filter(|path| path.exists())
}

/// Platform default config file path
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bookscene").join("config.toml"))
}

/// Load bootstrap configuration from a TOML file
pub fn load_bootstrap_config(path: &Path) -> Result<BootstrapConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let mut config: BootstrapConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    // Relative paths are resolved against the config file's directory
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.settings_file = config.settings_file.map(|p| absolutize(base, p));
    config.settings_database = config.settings_database.map(|p| absolutize(base, p));

    debug!(config_file = %path.display(), "Bootstrap configuration loaded");
    Ok(config)
}

/// Resolve and load the bootstrap configuration, or defaults if no file applies
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<BootstrapConfig> {
    match resolve_config_file(cli_arg, CONFIG_ENV_VAR) {
        Some(path) => load_bootstrap_config(&path),
        None => Ok(BootstrapConfig::default()),
    }
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
