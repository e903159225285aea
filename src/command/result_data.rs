// src/command/result_data.rs

//! Accumulated outcome of a command.

use std::fmt;

use serde::Serialize;

use crate::types::Errno;

/// One entry of the append-only error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultError {
    pub code: i32,
    pub message: String,
}

impl ResultError {
    pub fn new(errno: Errno, message: impl Into<String>) -> Self {
        Self {
            code: errno.code(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code, self.message)
    }
}

/// Result payload filled progressively by the execution host.
///
/// `stdout`/`stderr` hold the complete text; truncation happens when a
/// delivery message is assembled, which is why the original lengths can
/// always be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultData {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
    errors: Vec<ResultError>,
}

impl ResultData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn append_stdout(&mut self, chunk: &str) {
        self.stdout.push_str(chunk);
    }

    pub fn append_stderr(&mut self, chunk: &str) {
        self.stderr.push_str(chunk);
    }

    pub fn set_stdout(&mut self, text: impl Into<String>) {
        self.stdout = text.into();
    }

    pub fn set_stderr(&mut self, text: impl Into<String>) {
        self.stderr = text.into();
    }

    /// Untruncated stdout length in characters.
    pub fn stdout_original_length(&self) -> usize {
        self.stdout.chars().count()
    }

    /// Untruncated stderr length in characters.
    pub fn stderr_original_length(&self) -> usize {
        self.stderr.chars().count()
    }

    /// Exit code, present only if the command actually ran.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = Some(code);
    }

    pub fn errors(&self) -> &[ResultError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append an error. Earlier entries are never replaced.
    pub fn record_error(&mut self, errno: Errno, message: impl Into<String>) {
        self.errors.push(ResultError::new(errno, message));
    }

    /// Code of the most recent error, `0` when there is none.
    pub fn err_code(&self) -> i32 {
        self.errors
            .last()
            .map(|e| e.code)
            .unwrap_or_else(|| Errno::Success.code())
    }

    /// All error messages, one `(code) message` per line. Empty if none.
    pub fn errors_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
