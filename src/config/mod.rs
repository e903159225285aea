// src/config/mod.rs

//! Configuration loading and validation for cmdrelay.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate path and limit invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConnectionSection, DeliverySection, LoggingSection, NotificationsSection, RawRelayConfig,
    RelayConfig, DEFAULT_MAX_OUTPUT_CHARS,
};
pub use validate::validate_config;
