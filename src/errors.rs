// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Errno, ExecutionId};

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution host is not connected")]
    NotConnected,

    #[error("Execution host is connected but not bound yet")]
    NotReady,

    #[error("External callers are not allowed to run commands; set [connection].allow_external_apps = true")]
    ExternalAppsNotAllowed,

    #[error("Path {path:?} is not under any allowed parent path {allowed:?}")]
    PathPolicyViolation { path: PathBuf, allowed: Vec<PathBuf> },

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Result for execution {0} was already delivered")]
    AlreadyDelivered(ExecutionId),

    #[error("Execution host rejected the command: {0}")]
    HostRejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecError {
    /// Numeric code recorded in `ResultData` and sent as the `err` field.
    pub fn errno(&self) -> Errno {
        match self {
            ExecError::InvalidInput(_) => Errno::InvalidInput,
            ExecError::NotConnected => Errno::NotConnected,
            ExecError::NotReady => Errno::NotReady,
            ExecError::ExternalAppsNotAllowed => Errno::ExternalAppsNotAllowed,
            ExecError::PathPolicyViolation { .. } => Errno::PathPolicyViolation,
            ExecError::DeliveryFailed(_) | ExecError::AlreadyDelivered(_) => {
                Errno::DeliveryFailed
            }
            _ => Errno::Failed,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
