// src/channel/delivery.rs

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::channel::callback::CallbackRegistry;
use crate::channel::directory::{default_single_file_name, write_multiple_files, write_single_file};
use crate::channel::message::{OutputLimits, ResultEnvelope, ResultMessage};
use crate::channel::policy::PathPolicy;
use crate::command::ExecutionCommand;
use crate::config::RelayConfig;
use crate::errors::{ExecError, Result};
use crate::fs::FileSystem;
use crate::types::{DeliveryMode, ExecutionState};

/// Performs the single delivery attempt of a command's result.
pub struct ResultChannel {
    callbacks: Arc<CallbackRegistry>,
    fs: Arc<dyn FileSystem>,
    policy: PathPolicy,
    limits: OutputLimits,
}

impl std::fmt::Debug for ResultChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultChannel")
            .field("policy", &self.policy)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl ResultChannel {
    pub fn new(
        callbacks: Arc<CallbackRegistry>,
        fs: Arc<dyn FileSystem>,
        policy: PathPolicy,
        limits: OutputLimits,
    ) -> Self {
        Self {
            callbacks,
            fs,
            policy,
            limits,
        }
    }

    pub fn from_config(
        cfg: &RelayConfig,
        callbacks: Arc<CallbackRegistry>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let policy = PathPolicy::new(
            cfg.delivery.allowed_parent_paths.clone(),
            cfg.delivery.base_dir.clone(),
        );
        let limits = OutputLimits {
            max_stdout_chars: cfg.delivery.max_stdout_chars,
            max_stderr_chars: cfg.delivery.max_stderr_chars,
        };
        Self::new(callbacks, fs, policy, limits)
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Deliver the result of `command` according to its `ResultConfig`.
    ///
    /// - Rejected without side effects if the command has not executed yet
    ///   or its one delivery attempt was already spent.
    /// - A delivery error is appended to `result_data` and returned.
    /// - Afterwards the command is `Success` if it carries no error and the
    ///   delivery (if any) succeeded, `Failed` otherwise.
    pub fn deliver(&self, command: &mut ExecutionCommand) -> Option<ExecError> {
        if !command.has_executed() {
            warn!(
                execution_id = %command.id(),
                state = %command.state(),
                "{}: ignoring delivery request since the command has not executed",
                command.id_and_label()
            );
            return Some(ExecError::InvalidInput(format!(
                "execution {} has not executed (state {})",
                command.id(),
                command.state()
            )));
        }

        if command.result_config.delivery_attempted {
            error!(
                execution_id = %command.id(),
                "{}: result delivery requested twice",
                command.id_and_label()
            );
            return Some(ExecError::AlreadyDelivered(command.id()));
        }

        let mode = command.result_config.mode();
        let outcome = match mode {
            DeliveryMode::None => Ok(()),
            DeliveryMode::Callback => {
                command.result_config.delivery_attempted = true;
                self.deliver_callback(command)
            }
            DeliveryMode::Directory => {
                command.result_config.delivery_attempted = true;
                self.deliver_directory(command)
            }
        };

        let delivery_error = outcome.err();
        if let Some(err) = &delivery_error {
            error!(
                execution_id = %command.id(),
                ?mode,
                error = %err,
                "{}: failed to deliver result",
                command.id_and_label()
            );
            command.set_state_failed(err.errno(), err.to_string());
        } else if mode != DeliveryMode::None {
            info!(execution_id = %command.id(), ?mode, "{}: result delivered", command.id_and_label());
        }

        settle_state(command);
        delivery_error
    }

    /// Run [`ResultChannel::deliver`] on the blocking thread pool.
    ///
    /// Directory mode performs blocking file I/O; this keeps it off the
    /// async workers. The command is handed back together with the outcome.
    pub async fn deliver_blocking(
        self: Arc<Self>,
        mut command: ExecutionCommand,
    ) -> Result<(ExecutionCommand, Option<ExecError>)> {
        tokio::task::spawn_blocking(move || {
            let outcome = self.deliver(&mut command);
            (command, outcome)
        })
        .await
        .map_err(|e| ExecError::Other(anyhow!("delivery task did not complete: {e}")))
    }

    fn deliver_callback(&self, command: &mut ExecutionCommand) -> Result<()> {
        let Some(handle) = command.result_config.take_callback_handle() else {
            return Err(ExecError::DeliveryFailed(format!(
                "execution {} has no callback handle",
                command.id()
            )));
        };

        let message = ResultMessage::from_result_data(&command.result_data, self.limits);
        log_outgoing(command, &message);

        self.callbacks.invoke(handle, ResultEnvelope::new(message))
    }

    fn deliver_directory(&self, command: &mut ExecutionCommand) -> Result<()> {
        let basename = command.executable_basename().to_string();
        let Some(target) = command.result_config.directory_target_mut() else {
            return Err(ExecError::DeliveryFailed(format!(
                "execution {} has no result directory",
                command.id()
            )));
        };

        let resolved = self.policy.resolve(self.fs.as_ref(), &target.request.path)?;
        target.resolved_path = Some(resolved.path.clone());
        target.allowed_parent_path = Some(resolved.allowed_parent.clone());

        if target.request.single_file && target.request.file_basename.is_none() {
            target.request.file_basename = Some(default_single_file_name(&basename));
        }

        let request = target.request.clone();
        debug!(
            execution_id = %command.id(),
            dir = ?resolved.path,
            single_file = request.single_file,
            "writing result to directory"
        );

        match (request.single_file, request.file_basename.as_deref()) {
            (true, Some(name)) => {
                write_single_file(self.fs.as_ref(), &resolved.path, name, &command.result_data)?;
            }
            _ => {
                write_multiple_files(
                    self.fs.as_ref(),
                    &resolved.path,
                    request.files_suffix.as_deref(),
                    &command.result_data,
                )?;
            }
        }
        Ok(())
    }
}

/// Move an executed command into its terminal state.
fn settle_state(command: &mut ExecutionCommand) {
    if command.state().is_terminal() {
        return;
    }
    let next = if command.result_data.has_errors() {
        ExecutionState::Failed
    } else {
        ExecutionState::Success
    };
    command.set_state(next);
}

fn log_outgoing(command: &ExecutionCommand, message: &ResultMessage) {
    if command.payload_logging_enabled() {
        debug!(
            execution_id = %command.id(),
            stdout = %message.stdout,
            stdout_original_length = message.stdout_original_length,
            stderr = %message.stderr,
            stderr_original_length = message.stderr_original_length,
            exit_code = ?message.exit_code,
            err = message.err,
            errmsg = %message.errmsg,
            "sending result"
        );
    } else {
        debug!(
            execution_id = %command.id(),
            exit_code = ?message.exit_code,
            err = message.err,
            "sending result"
        );
    }
}
