// src/channel/message.rs

//! Strongly typed result message exchanged in callback mode.
//!
//! The field names are part of the wire compatibility surface: a message is
//! a JSON object `{"version": 1, "result": {...}}` whose inner keys are the
//! ones listed in [`ResultKeys::V1`]. Unknown fields are rejected.

use serde::{Deserialize, Serialize};

use crate::command::result_data::truncate_chars;
use crate::command::ResultData;
use crate::errors::{ExecError, Result};

/// Version written by this crate and the only one it accepts.
pub const MESSAGE_VERSION: u32 = 1;

/// Fixed field names of the delivered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultKeys {
    pub result: &'static str,
    pub stdout: &'static str,
    pub stdout_original_length: &'static str,
    pub stderr: &'static str,
    pub stderr_original_length: &'static str,
    pub exit_code: &'static str,
    pub err: &'static str,
    pub errmsg: &'static str,
}

impl ResultKeys {
    pub const V1: ResultKeys = ResultKeys {
        result: "result",
        stdout: "stdout",
        stdout_original_length: "stdout_original_length",
        stderr: "stderr",
        stderr_original_length: "stderr_original_length",
        exit_code: "exitCode",
        err: "err",
        errmsg: "errmsg",
    };
}

/// Result fields, keyed by [`ResultKeys::V1`] on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultMessage {
    #[serde(rename = "stdout")]
    pub stdout: String,
    #[serde(rename = "stdout_original_length")]
    pub stdout_original_length: usize,
    #[serde(rename = "stderr")]
    pub stderr: String,
    #[serde(rename = "stderr_original_length")]
    pub stderr_original_length: usize,
    /// Absent when the command never ran.
    #[serde(rename = "exitCode")]
    pub exit_code: Option<i32>,
    /// `0` means success.
    #[serde(rename = "err")]
    pub err: i32,
    /// Empty when there is no error.
    #[serde(rename = "errmsg")]
    pub errmsg: String,
}

/// Output caps applied while assembling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLimits {
    pub max_stdout_chars: usize,
    pub max_stderr_chars: usize,
}

impl OutputLimits {
    pub const UNLIMITED: OutputLimits = OutputLimits {
        max_stdout_chars: usize::MAX,
        max_stderr_chars: usize::MAX,
    };
}

impl ResultMessage {
    /// Assemble a message from `data`, clipping stdout/stderr to `limits`
    /// while keeping their untruncated lengths.
    pub fn from_result_data(data: &ResultData, limits: OutputLimits) -> Self {
        Self {
            stdout: truncate_chars(data.stdout(), limits.max_stdout_chars).to_string(),
            stdout_original_length: data.stdout_original_length(),
            stderr: truncate_chars(data.stderr(), limits.max_stderr_chars).to_string(),
            stderr_original_length: data.stderr_original_length(),
            exit_code: data.exit_code(),
            err: data.err_code(),
            errmsg: data.errors_summary(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.err == 0
    }

    pub fn stdout_truncated(&self) -> bool {
        self.stdout.chars().count() < self.stdout_original_length
    }

    pub fn stderr_truncated(&self) -> bool {
        self.stderr.chars().count() < self.stderr_original_length
    }
}

/// Versioned container wrapping the message under the `result` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultEnvelope {
    pub version: u32,
    #[serde(rename = "result")]
    pub result: ResultMessage,
}

impl ResultEnvelope {
    pub fn new(result: ResultMessage) -> Self {
        Self {
            version: MESSAGE_VERSION,
            result,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ExecError::DeliveryFailed(format!("serializing result message: {e}")))
    }

    /// Parse and version-check an inbound message.
    pub fn from_json(text: &str) -> Result<Self> {
        let envelope: ResultEnvelope = serde_json::from_str(text)
            .map_err(|e| ExecError::InvalidInput(format!("malformed result message: {e}")))?;
        if envelope.version != MESSAGE_VERSION {
            return Err(ExecError::InvalidInput(format!(
                "unsupported result message version {} (expected {MESSAGE_VERSION})",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}
