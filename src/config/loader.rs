// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate the
/// commands. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), commands = config.command.len(), "config loaded");
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks that:
///   - there is at least one command,
///   - every `cmd` parses as a command line,
///   - timeouts are valid durations,
///   - exit-code settings are not contradictory,
///   - `[vars]` only holds scalar or array values.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// `PROCRUN_CONFIG` if set, otherwise `Procrun.toml` in the current working
/// directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("PROCRUN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Procrun.toml"))
}
