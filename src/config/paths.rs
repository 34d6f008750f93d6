//! Platform-specific config directory helpers.
//!
//! Uses the `dirs` crate to resolve platform-appropriate directories:
//! - Linux:   `~/.config/scpup/`
//! - Windows: `%APPDATA%\scpup\`
//! - macOS:   `~/Library/Application Support/scpup/`

use std::path::PathBuf;

use crate::error::ScpError;

/// Get the scpup config directory. The directory is not created.
pub fn scpup_config_dir() -> Result<PathBuf, ScpError> {
    let base = dirs::config_dir()
        .ok_or_else(|| ScpError::Config("Could not determine config directory".into()))?;
    Ok(base.join("scpup"))
}

/// Default location of `config.toml`.
pub fn default_config_path() -> Result<PathBuf, ScpError> {
    Ok(scpup_config_dir()?.join("config.toml"))
}
