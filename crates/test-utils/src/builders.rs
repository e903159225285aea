#![allow(dead_code)]

use std::path::PathBuf;

use cmdrelay::command::{CommandRequest, DeliveryRequest, DirectoryRequest};
use cmdrelay::config::{RawRelayConfig, RelayConfig};
use cmdrelay::types::LogLevel;

/// Builder for `RelayConfig` to simplify test setup.
pub struct ConfigBuilder {
    config: RawRelayConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawRelayConfig::default(),
        }
    }

    pub fn allow_parent(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.delivery.allowed_parent_paths.push(path.into());
        self
    }

    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.delivery.base_dir = Some(path.into());
        self
    }

    pub fn bin_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.connection.bin_dir = Some(path.into());
        self
    }

    pub fn allow_external_apps(mut self, allow: bool) -> Self {
        self.config.connection.allow_external_apps = allow;
        self
    }

    pub fn max_stdout_chars(mut self, max: usize) -> Self {
        self.config.delivery.max_stdout_chars = max;
        self
    }

    pub fn max_stderr_chars(mut self, max: usize) -> Self {
        self.config.delivery.max_stderr_chars = max;
        self
    }

    pub fn error_notifications(mut self, enabled: bool) -> Self {
        self.config.notifications.error_notifications_enabled = enabled;
        self
    }

    pub fn build(self) -> RelayConfig {
        RelayConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CommandRequest`.
pub struct RequestBuilder {
    request: CommandRequest,
}

impl RequestBuilder {
    pub fn new(executable: &str) -> Self {
        Self {
            request: CommandRequest::new(executable, Vec::<String>::new()),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.request.arguments.push(arg.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.request.label = Some(label.to_string());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.request.log_level = Some(level);
        self
    }

    pub fn external(mut self) -> Self {
        self.request = self.request.external();
        self
    }

    pub fn callback(mut self) -> Self {
        self.request.delivery = DeliveryRequest::Callback;
        self
    }

    pub fn directory(mut self, dir: DirectoryRequest) -> Self {
        self.request.delivery = DeliveryRequest::Directory(dir);
        self
    }

    pub fn build(self) -> CommandRequest {
        self.request
    }
}
