// src/reporter/mod.rs

//! Failure reporting.
//!
//! [`FailureReporter`] is where an executed command ends up. It hands any
//! pending result to the [`ResultChannel`] and, when something went wrong
//! that the requester will not present itself, raises a local alert through
//! the [`AlertPresenter`] collaborator.

pub mod presenter;
pub mod settings;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

pub use presenter::{
    AlertPresenter, EnvironmentSummary, ErrorReport, LogPresenter, PersistentAlert,
    ERROR_ALERT_TITLE,
};
pub use settings::NotificationSettings;

use crate::channel::ResultChannel;
use crate::command::ExecutionCommand;
use crate::errors::ExecError;
use crate::ids::IdSource;
use crate::types::{Errno, ExecutionState};

/// Error recorded on commands cancelled because the host is going away.
pub const CANCELLED_MESSAGE: &str =
    "Execution has been cancelled since execution service is being killed";

pub struct FailureReporter {
    channel: Arc<ResultChannel>,
    settings: Arc<dyn NotificationSettings>,
    presenter: Arc<dyn AlertPresenter>,
    notification_ids: IdSource,
}

impl std::fmt::Debug for FailureReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureReporter")
            .field("channel", &self.channel)
            .field("next_notification_id", &self.notification_ids.peek())
            .finish_non_exhaustive()
    }
}

impl FailureReporter {
    pub fn new(
        channel: Arc<ResultChannel>,
        settings: Arc<dyn NotificationSettings>,
        presenter: Arc<dyn AlertPresenter>,
    ) -> Self {
        Self {
            channel,
            settings,
            presenter,
            notification_ids: IdSource::starting_at(1),
        }
    }

    pub fn channel(&self) -> &Arc<ResultChannel> {
        &self.channel
    }

    /// Settle an executed command.
    ///
    /// A failed command is routed to [`Self::report_execution_error`].
    /// Otherwise a pending result is delivered; if that delivery fails the
    /// error is recorded, the command fails and an alert is always raised.
    /// Returns the delivery error, if any.
    pub fn process_result(&self, command: &mut ExecutionCommand) -> Option<ExecError> {
        if !command.has_executed() {
            warn!(
                execution_id = %command.id(),
                state = %command.state(),
                "{}: ignoring result processing since the command has not executed",
                command.id_and_label()
            );
            return Some(ExecError::InvalidInput(format!(
                "execution {} has not executed (state {})",
                command.id(),
                command.state()
            )));
        }

        match command.state() {
            ExecutionState::Failed => return self.report_execution_error(command, false),
            ExecutionState::Success => {
                debug!(execution_id = %command.id(), "result already processed");
                return None;
            }
            _ => {}
        }

        if command.has_pending_result() {
            let delivery_error = self.channel.deliver(command);
            if delivery_error.is_some() {
                self.notify(command);
            }
            return delivery_error;
        }

        if command.result_data.has_errors() {
            command.set_state(ExecutionState::Failed);
            return self.report_execution_error(command, false);
        }

        command.set_state(ExecutionState::Success);
        info!(execution_id = %command.id(), "{}: finished", command.id_and_label());
        None
    }

    /// Report a failed command.
    ///
    /// A pending result is delivered first; the requester then owns showing
    /// the error, unless delivery failed or `force_notify` is set. Otherwise
    /// the alert is gated by the error-notifications setting, which
    /// `force_notify` overrides. Returns the delivery error, if any.
    pub fn report_execution_error(
        &self,
        command: &mut ExecutionCommand,
        force_notify: bool,
    ) -> Option<ExecError> {
        if !command.is_state_failed() {
            warn!(
                execution_id = %command.id(),
                state = %command.state(),
                "{}: ignoring error report since the command has not failed",
                command.id_and_label()
            );
            return None;
        }

        error!(
            execution_id = %command.id(),
            exit_code = ?command.result_data.exit_code(),
            "{} failed:\n{}",
            command.id_and_label(),
            command.result_data.errors_summary()
        );

        let mut force_notify = force_notify;
        let mut delivery_error = None;

        if command.has_pending_result() {
            delivery_error = self.channel.deliver(command);
            if delivery_error.is_some() {
                force_notify = true;
            }
            if !force_notify {
                debug!(
                    execution_id = %command.id(),
                    "result delivered to requester; no local alert"
                );
                return None;
            }
        }

        if !force_notify && !self.settings.error_notifications_enabled() {
            debug!(execution_id = %command.id(), "error notifications disabled");
            return delivery_error;
        }

        self.notify(command);
        delivery_error
    }

    /// Fail a command that will never complete because the host is shutting
    /// down, and hand its result back so no requester waits forever.
    pub fn cancel_pending(&self, command: &mut ExecutionCommand) -> Option<ExecError> {
        if command.state().is_terminal() {
            return None;
        }
        info!(execution_id = %command.id(), "{}: cancelling", command.id_and_label());
        command.set_state_failed(Errno::Cancelled, CANCELLED_MESSAGE);
        self.report_execution_error(command, false)
    }

    /// Show the transient message and raise a persistent alert.
    fn notify(&self, command: &ExecutionCommand) -> u64 {
        let text = command.result_data.errors_summary();
        self.presenter.show_transient(&text);

        let notification_id = self.notification_ids.next();
        self.presenter.raise_alert(PersistentAlert {
            notification_id,
            title: ERROR_ALERT_TITLE.to_string(),
            text,
            report: ErrorReport::for_command(command),
        });
        debug!(execution_id = %command.id(), notification_id, "raised error alert");
        notification_id
    }
}
