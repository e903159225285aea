// src/command/mod.rs

//! The unit of work and its lifecycle.
//!
//! - [`ExecutionCommand`] carries the request, the monotonic state machine
//!   and the accumulated [`ResultData`].
//! - [`CommandRequest`] is what callers hand to the connection manager; the
//!   manager turns it into an `ExecutionCommand` at admission.
//! - [`result_config`] describes how the result travels back.

pub mod result_config;
pub mod result_data;

use std::path::PathBuf;

use tracing::{debug, warn};

pub use result_config::{
    DeliveryRequest, DirectoryRequest, DirectoryTarget, ResultConfig, ResultTarget,
};
pub use result_data::{ResultData, ResultError};

use crate::types::{DeliveryMode, Errno, ExecutionId, ExecutionState, LogLevel};

/// Label used when the caller does not provide one.
pub const DEFAULT_COMMAND_LABEL: &str = "Execution Intent Command";

/// Caller-side description of a command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub executable: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Only honoured for background commands.
    pub stdin: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub run_in_background: bool,
    pub is_external_request: bool,
    pub log_level: Option<LogLevel>,
    pub delivery: DeliveryRequest,
}

impl CommandRequest {
    pub fn new<I, S>(executable: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            working_directory: None,
            stdin: None,
            label: None,
            description: None,
            run_in_background: true,
            is_external_request: false,
            log_level: None,
            delivery: DeliveryRequest::None,
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryRequest) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Mark the request as coming from a caller outside this process.
    pub fn external(mut self) -> Self {
        self.is_external_request = true;
        self
    }
}

/// One admitted execution request.
#[derive(Debug)]
pub struct ExecutionCommand {
    id: ExecutionId,
    pub executable: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub stdin: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub run_in_background: bool,
    pub is_external_request: bool,
    /// Payload logging verbosity for this command only.
    pub log_level: Option<LogLevel>,
    state: ExecutionState,
    pub result_config: ResultConfig,
    pub result_data: ResultData,
}

impl ExecutionCommand {
    /// Create a command in `PreExecution` with no pending result.
    pub fn new<I, S>(id: ExecutionId, executable: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            executable: executable.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            working_directory: None,
            stdin: None,
            label: DEFAULT_COMMAND_LABEL.to_string(),
            description: None,
            run_in_background: true,
            is_external_request: false,
            log_level: None,
            state: ExecutionState::PreExecution,
            result_config: ResultConfig::none(),
            result_data: ResultData::new(),
        }
    }

    /// Build from an admitted request. Delivery wiring is left to the caller.
    pub(crate) fn from_request(
        id: ExecutionId,
        request: CommandRequest,
        executable: String,
        result_config: ResultConfig,
    ) -> Self {
        Self {
            id,
            executable,
            arguments: request.arguments,
            working_directory: request.working_directory,
            stdin: if request.run_in_background {
                request.stdin
            } else {
                None
            },
            label: request
                .label
                .unwrap_or_else(|| DEFAULT_COMMAND_LABEL.to_string()),
            description: request.description,
            run_in_background: request.run_in_background,
            is_external_request: request.is_external_request,
            log_level: request.log_level,
            state: ExecutionState::PreExecution,
            result_config,
            result_data: ResultData::new(),
        }
    }

    pub fn with_result_config(mut self, config: ResultConfig) -> Self {
        self.result_config = config;
        self
    }

    pub fn external(mut self) -> Self {
        self.is_external_request = true;
        self
    }

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Move to `next` if that keeps the lifecycle monotonic.
    ///
    /// Invalid transitions are logged and ignored; returns whether the state
    /// changed (or already was `next`).
    pub fn set_state(&mut self, next: ExecutionState) -> bool {
        if self.state == next && !next.is_terminal() {
            return true;
        }
        if !self.state.can_transition_to(next) {
            warn!(
                execution_id = %self.id,
                current = %self.state,
                requested = %next,
                "{}: ignoring invalid state transition",
                self.id_and_label()
            );
            return false;
        }
        debug!(execution_id = %self.id, from = %self.state, to = %next, "state transition");
        self.state = next;
        true
    }

    /// Record an error and mark the command failed.
    ///
    /// Errors are appended to any already present. A command that already
    /// reached `Success` cannot fail afterwards.
    pub fn set_state_failed(&mut self, errno: Errno, message: impl Into<String>) -> bool {
        let message = message.into();
        match self.state {
            ExecutionState::Success => {
                warn!(
                    execution_id = %self.id,
                    error = %message,
                    "{}: cannot mark a successful command as failed",
                    self.id_and_label()
                );
                false
            }
            ExecutionState::Failed => {
                self.result_data.record_error(errno, message);
                true
            }
            _ => {
                self.result_data.record_error(errno, message);
                self.state = ExecutionState::Failed;
                true
            }
        }
    }

    /// True once the host finished running the command.
    pub fn has_executed(&self) -> bool {
        self.state >= ExecutionState::Executed
    }

    pub fn is_state_failed(&self) -> bool {
        self.state == ExecutionState::Failed
    }

    /// Whether a requester is still waiting for this command's result.
    pub fn has_pending_result(&self) -> bool {
        self.result_config.mode() != DeliveryMode::None && !self.result_config.delivery_attempted()
    }

    /// `"(<id>) <label>"`, used as a prefix for log lines.
    pub fn id_and_label(&self) -> String {
        format!("({}) {}", self.id, self.label)
    }

    /// Executable followed by its arguments, space separated.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether stdout/stderr payloads may appear in log output.
    pub fn payload_logging_enabled(&self) -> bool {
        self.log_level.is_none_or(|lvl| lvl >= LogLevel::Debug)
    }

    /// Last path component of the executable.
    pub fn executable_basename(&self) -> &str {
        self.executable
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(self.executable.as_str())
    }
}
