// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Process-wide unique identifier of an admitted execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ExecutionId {
    fn from(value: u64) -> Self {
        ExecutionId(value)
    }
}

/// Lifecycle state of an `ExecutionCommand`.
///
/// Declaration order is the lifecycle order. `Success` and `Failed` are both
/// terminal and neither may follow the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExecutionState {
    PreExecution,
    Executing,
    Executed,
    Success,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Success | ExecutionState::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Staying in the same non-terminal state is allowed. Terminal states
    /// accept no further transition.
    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next >= self
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionState::PreExecution => "pre-execution",
            ExecutionState::Executing => "executing",
            ExecutionState::Executed => "executed",
            ExecutionState::Success => "success",
            ExecutionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Numeric error codes carried in `ResultData::errors` and the `err` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Errno {
    Success,
    Failed,
    Cancelled,
    InvalidInput,
    PathPolicyViolation,
    DeliveryFailed,
    NotConnected,
    NotReady,
    ExternalAppsNotAllowed,
}

impl Errno {
    pub fn code(self) -> i32 {
        match self {
            Errno::Success => 0,
            Errno::Failed => 1,
            Errno::Cancelled => 2,
            Errno::InvalidInput => 3,
            Errno::PathPolicyViolation => 4,
            Errno::DeliveryFailed => 5,
            Errno::NotConnected => 6,
            Errno::NotReady => 7,
            Errno::ExternalAppsNotAllowed => 8,
        }
    }
}

/// How a result is returned to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeliveryMode {
    None,
    Callback,
    Directory,
}

/// Log verbosity, used for the subscriber and per-command payload logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}
