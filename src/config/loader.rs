// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{RawRelayConfig, RelayConfig};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated sections.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to get
/// a [`RelayConfig`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRelayConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: RawRelayConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks that every configured path is absolute and limits are non-zero.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RelayConfig> {
    let raw = load_from_path(&path)?;
    RelayConfig::try_from(raw)
}

/// Config path used when the embedding application does not name one.
///
/// `CMDRELAY_CONFIG` wins over `cmdrelay.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("CMDRELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("cmdrelay.toml"))
}
