// src/channel/directory.rs

//! Directory-mode result writing.
//!
//! Two layouts are supported:
//! - single file: one JSON document containing the full result message,
//!   named `<executable-basename>-<local-timestamp-millis>.log` unless the
//!   caller chose a name;
//! - multi file: `stdout`, `stderr`, `exit_code`, `err` and `errmsg`, each
//!   with the optional caller-supplied suffix.
//!
//! Writes are blocking and must not run on a latency-sensitive thread; see
//! `ResultChannel::deliver_blocking`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::channel::message::{OutputLimits, ResultEnvelope, ResultMessage};
use crate::command::ResultData;
use crate::errors::{ExecError, Result};
use crate::fs::FileSystem;

pub const STDOUT_FILE: &str = "stdout";
pub const STDERR_FILE: &str = "stderr";
pub const EXIT_CODE_FILE: &str = "exit_code";
pub const ERR_FILE: &str = "err";
pub const ERRMSG_FILE: &str = "errmsg";

/// Current local time as `YYYY-MM-DD_HH.MM.SS.mmm`.
pub fn local_timestamp_millis() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d_%H.%M.%S%.3f")
        .to_string()
}

/// Default single-file name for a command.
pub fn default_single_file_name(executable_basename: &str) -> String {
    format!("{executable_basename}-{}.log", local_timestamp_millis())
}

/// Write `data` as one structured file. Returns the written path.
pub fn write_single_file(
    fs: &dyn FileSystem,
    dir: &Path,
    file_name: &str,
    data: &ResultData,
) -> Result<PathBuf> {
    let path = child_path(dir, file_name)?;
    let envelope = ResultEnvelope::new(ResultMessage::from_result_data(
        data,
        OutputLimits::UNLIMITED,
    ));
    let json = envelope.to_json()?;

    fs.write(&path, json.as_bytes())
        .map_err(|e| ExecError::DeliveryFailed(format!("{e:#}")))?;

    info!(path = ?path, "wrote result file");
    Ok(path)
}

/// Write one file per result field. Returns the written paths.
pub fn write_multiple_files(
    fs: &dyn FileSystem,
    dir: &Path,
    suffix: Option<&str>,
    data: &ResultData,
) -> Result<Vec<PathBuf>> {
    let suffix = suffix.unwrap_or("");
    let exit_code = data
        .exit_code()
        .map(|code| code.to_string())
        .unwrap_or_default();
    let err = data.err_code().to_string();
    let errmsg = data.errors_summary();

    let files: [(&str, &str); 5] = [
        (STDOUT_FILE, data.stdout()),
        (STDERR_FILE, data.stderr()),
        (EXIT_CODE_FILE, exit_code.as_str()),
        (ERR_FILE, err.as_str()),
        (ERRMSG_FILE, errmsg.as_str()),
    ];

    fs.create_dir_all(dir)
        .map_err(|e| ExecError::DeliveryFailed(format!("{e:#}")))?;

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = child_path(dir, &format!("{name}{suffix}"))?;
        fs.write(&path, contents.as_bytes())
            .map_err(|e| ExecError::DeliveryFailed(format!("{e:#}")))?;
        debug!(path = ?path, bytes = contents.len(), "wrote result field file");
        written.push(path);
    }

    info!(dir = ?dir, files = written.len(), "wrote result files");
    Ok(written)
}

/// `dir/name`, refusing names that would leave `dir`.
fn child_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let stays_inside = !name.is_empty()
        && name != "."
        && name != ".."
        && path.parent() == Some(dir);
    if !stays_inside {
        return Err(ExecError::PathPolicyViolation {
            path,
            allowed: vec![dir.to_path_buf()],
        });
    }
    Ok(path)
}
