//! Platform-specific paths for configuration.
//!
//! # Lookup Order
//!
//! 1. An explicit `--config` path
//! 2. `seisgram.toml` in the current directory
//! 3. `config.toml` in the user config directory: `~/.config/seisgram/` (Linux),
//!    `~/Library/Application Support/seisgram/` (macOS), `%APPDATA%\seisgram\` (Windows)

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "seisgram";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "seisgram.toml";

/// Config file name inside the user config directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the user config file.
pub fn user_config_path() -> PathBuf {
    user_config_dir().join(USER_CONFIG_FILE)
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Resolve the config file to load, searching `cwd` for the local file.
///
/// An explicit path is returned as given, even if it does not exist, so the
/// caller reports the read error.
pub fn find_config_in(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = user_config_path();
    user.is_file().then_some(user)
}

/// [`find_config_in`] relative to the process working directory.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_config_in(explicit, &cwd)
}
