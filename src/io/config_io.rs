use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::ItineraConfig;

/// Config file looked up in the working directory when none is given
pub const CONFIG_FILE_NAME: &str = "itinera.toml";

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read and parse one config file. Missing fields take their defaults.
pub fn read_config(path: &Path) -> Result<ItineraConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// An explicit path must exist. Without one, `itinera.toml` in `dir` is used
/// when present, otherwise the defaults.
pub fn load_config_from(explicit: Option<&Path>, dir: &Path) -> Result<ItineraConfig, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let local = dir.join(CONFIG_FILE_NAME);
    if local.is_file() {
        tracing::debug!(path = %local.display(), "using local config");
        return read_config(&local);
    }
    Ok(ItineraConfig::default())
}

/// [`load_config_from`] relative to the current directory
pub fn load_config(explicit: Option<&Path>) -> Result<ItineraConfig, ConfigError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    load_config_from(explicit, &cwd)
}
