// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::reporter::NotificationSettings;
use crate::types::LogLevel;

/// Default cap on delivered stdout/stderr characters in callback mode.
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 100_000;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [connection]
/// bin_dir = "/data/data/app/files/usr/bin"
/// allow_external_apps = true
///
/// [delivery]
/// allowed_parent_paths = ["/storage/emulated/0"]
/// max_stdout_chars = 100000
///
/// [notifications]
/// error_notifications_enabled = true
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRelayConfig {
    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub delivery: DeliverySection,

    #[serde(default)]
    pub notifications: NotificationsSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[connection]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Directory prepended to bare executable names (no `/`).
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,

    /// Whether requests from external callers are admitted at all.
    #[serde(default)]
    pub allow_external_apps: bool,
}

/// `[delivery]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliverySection {
    /// Directory-mode destinations must fall under one of these.
    #[serde(default)]
    pub allowed_parent_paths: Vec<PathBuf>,

    /// Relative result directories are resolved against this directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    #[serde(default = "default_max_output_chars")]
    pub max_stdout_chars: usize,

    #[serde(default = "default_max_output_chars")]
    pub max_stderr_chars: usize,
}

fn default_max_output_chars() -> usize {
    DEFAULT_MAX_OUTPUT_CHARS
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            allowed_parent_paths: Vec::new(),
            base_dir: None,
            max_stdout_chars: DEFAULT_MAX_OUTPUT_CHARS,
            max_stderr_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }
}

/// `[notifications]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsSection {
    #[serde(default = "default_true")]
    pub error_notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            error_notifications_enabled: true,
        }
    }
}

impl NotificationSettings for NotificationsSection {
    fn error_notifications_enabled(&self) -> bool {
        self.error_notifications_enabled
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Validated configuration.
///
/// Only obtainable through [`RelayConfig::try_from`] (or the loader), so
/// code holding one can rely on absolute paths and non-zero limits.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub connection: ConnectionSection,
    pub delivery: DeliverySection,
    pub notifications: NotificationsSection,
    pub logging: LoggingSection,
}

impl RelayConfig {
    pub(crate) fn new_unchecked(raw: RawRelayConfig) -> Self {
        Self {
            connection: raw.connection,
            delivery: raw.delivery,
            notifications: raw.notifications,
            logging: raw.logging,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new_unchecked(RawRelayConfig::default())
    }
}
