// src/config/validate.rs

use std::path::Path;

use crate::config::model::{RawRelayConfig, RelayConfig};
use crate::errors::{ExecError, Result};

impl TryFrom<RawRelayConfig> for RelayConfig {
    type Error = ExecError;

    fn try_from(raw: RawRelayConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(RelayConfig::new_unchecked(raw))
    }
}

/// Re-run validation on an already constructed config.
pub fn validate_config(cfg: &RelayConfig) -> Result<()> {
    validate_raw_config(&RawRelayConfig {
        connection: cfg.connection.clone(),
        delivery: cfg.delivery.clone(),
        notifications: cfg.notifications.clone(),
        logging: cfg.logging.clone(),
    })
}

fn validate_raw_config(cfg: &RawRelayConfig) -> Result<()> {
    validate_connection(cfg)?;
    validate_delivery_paths(cfg)?;
    validate_output_limits(cfg)?;
    Ok(())
}

fn validate_connection(cfg: &RawRelayConfig) -> Result<()> {
    if let Some(bin_dir) = cfg.connection.bin_dir.as_deref() {
        ensure_absolute("[connection].bin_dir", bin_dir)?;
    }
    Ok(())
}

fn validate_delivery_paths(cfg: &RawRelayConfig) -> Result<()> {
    for path in cfg.delivery.allowed_parent_paths.iter() {
        ensure_absolute("[delivery].allowed_parent_paths", path)?;
    }
    if let Some(base) = cfg.delivery.base_dir.as_deref() {
        ensure_absolute("[delivery].base_dir", base)?;
    }
    Ok(())
}

fn validate_output_limits(cfg: &RawRelayConfig) -> Result<()> {
    if cfg.delivery.max_stdout_chars == 0 {
        return Err(ExecError::ConfigError(
            "[delivery].max_stdout_chars must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.delivery.max_stderr_chars == 0 {
        return Err(ExecError::ConfigError(
            "[delivery].max_stderr_chars must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn ensure_absolute(field: &str, path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(ExecError::ConfigError(format!(
            "{field} must contain absolute paths (got {path:?})"
        )));
    }
    Ok(())
}
