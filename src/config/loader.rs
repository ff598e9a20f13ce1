//! Configuration file and environment loading.

use crate::config::schema::EnvironmentConfig;
use crate::error::{DepConflictError, Result};
use std::ffi::OsString;
use std::fs;
use std::path::Path;

/// Environment variable holding extra search paths, in platform `PATH` form.
pub const SEARCH_PATH_ENV: &str = "DEPCONFLICT_PATH";

/// Load a single config file and parse it into EnvironmentConfig.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<EnvironmentConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DepConflictError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DepConflictError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into EnvironmentConfig.
///
/// An empty document yields the default config.
pub fn parse_config(content: &str, source_path: &Path) -> Result<EnvironmentConfig> {
    if content.trim().is_empty() {
        return Ok(EnvironmentConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| DepConflictError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Put paths from `value` (platform `PATH` syntax) ahead of the configured ones.
pub fn apply_search_path_override(config: &mut EnvironmentConfig, value: Option<OsString>) {
    let Some(value) = value else {
        return;
    };
    let mut paths: Vec<_> = std::env::split_paths(&value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    if paths.is_empty() {
        return;
    }
    tracing::debug!("{} adds {} search path(s)", SEARCH_PATH_ENV, paths.len());
    paths.append(&mut config.search_paths);
    config.search_paths = paths;
}

/// Load config with optional file override.
///
/// Starts from `config_file` when given, otherwise from defaults, then
/// applies `DEPCONFLICT_PATH`.
pub fn load_config(config_file: Option<&Path>) -> Result<EnvironmentConfig> {
    match config_file {
        Some(path) => {
            let mut config = load_config_file(path)?;
            apply_search_path_override(&mut config, std::env::var_os(SEARCH_PATH_ENV));
            Ok(config)
        }
        None => Ok(EnvironmentConfig::from_env()),
    }
}
