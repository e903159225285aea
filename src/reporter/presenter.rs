// src/reporter/presenter.rs

//! Presentation seam for locally visible alerts.
//!
//! Rendering (toasts, notification channels, report screens) is owned by the
//! embedding application. The reporter only builds the content.

use std::fmt;

use tracing::{error, warn};

use crate::command::{ExecutionCommand, ResultError};

/// Title every command error alert carries.
pub const ERROR_ALERT_TITLE: &str = "Execution Command Error";

/// Detailed report an alert's action opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub title: String,
    pub label: String,
    pub command_line: String,
    pub description: Option<String>,
    pub errors: Vec<ResultError>,
    pub environment: EnvironmentSummary,
}

impl ErrorReport {
    pub fn for_command(command: &ExecutionCommand) -> Self {
        Self {
            title: ERROR_ALERT_TITLE.to_string(),
            label: command.id_and_label(),
            command_line: command.command_line(),
            description: command.description.clone(),
            errors: command.result_data.errors().to_vec(),
            environment: EnvironmentSummary::current(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "command: {}", self.label)?;
        writeln!(f, "command line: {}", self.command_line)?;
        if let Some(desc) = &self.description {
            writeln!(f, "description: {desc}")?;
        }
        writeln!(f, "errors:")?;
        for err in &self.errors {
            writeln!(f, "  {err}")?;
        }
        write!(f, "environment: {}", self.environment)
    }
}

/// Build and platform details attached to every report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSummary {
    pub crate_name: &'static str,
    pub crate_version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

impl EnvironmentSummary {
    pub fn current() -> Self {
        Self {
            crate_name: env!("CARGO_PKG_NAME"),
            crate_version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

impl fmt::Display for EnvironmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}/{})",
            self.crate_name, self.crate_version, self.os, self.arch
        )
    }
}

/// A persistent alert, distinct per `notification_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentAlert {
    pub notification_id: u64,
    pub title: String,
    pub text: String,
    pub report: ErrorReport,
}

/// UI collaborator that shows alerts.
pub trait AlertPresenter: Send + Sync {
    /// Short-lived message (toast-like).
    fn show_transient(&self, text: &str);

    /// Alert that stays until dismissed; its action opens `alert.report`.
    fn raise_alert(&self, alert: PersistentAlert);
}

/// Presenter used when no UI is attached: alerts go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl AlertPresenter for LogPresenter {
    fn show_transient(&self, text: &str) {
        warn!(target: "cmdrelay::alert", "{text}");
    }

    fn raise_alert(&self, alert: PersistentAlert) {
        error!(
            target: "cmdrelay::alert",
            notification_id = alert.notification_id,
            "{}: {}\n{}",
            alert.title,
            alert.text,
            alert.report
        );
    }
}
