//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "STATUSPULSE_CONFIG";

/// Get the statuspulse base directory (~/.statuspulse).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".statuspulse"))
}

/// Get the main config file path (~/.statuspulse/statuspulse.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("statuspulse.json5"))
}
