//! Configuration file resolution and loading
//!
//! Config file location priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/cuelight/config.toml`)
//! 4. None: caller falls back to built-in defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CUELIGHT_CONFIG";

/// Resolve which config file to load, if any
///
/// An explicit CLI path or env var is returned even when the file does not
/// exist, so the caller can report it. The platform default is only returned
/// when present on disk.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_file()
}

/// Platform default config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("cuelight").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cuelight/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read config file {}: {}", path.display(), e))
    })?;
    debug!("Loaded config file {}", path.display());
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_argument_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/explicit.toml")), "CUELIGHT_UNUSED_VAR");
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = load_toml::<toml::Value>(Path::new("/nonexistent/cuelight.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
