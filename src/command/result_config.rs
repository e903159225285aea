// src/command/result_config.rs

//! Where and how a command's result must be returned.

use std::path::PathBuf;

use crate::channel::callback::CallbackHandle;
use crate::channel::message::ResultKeys;
use crate::types::DeliveryMode;

/// Delivery requested by the caller at admission time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeliveryRequest {
    /// Fire-and-forget.
    #[default]
    None,
    /// Invoke the caller's registered result endpoint.
    Callback,
    /// Write result files under a directory.
    Directory(DirectoryRequest),
}

/// Directory-mode options as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRequest {
    /// Destination directory; relative paths resolve against `[delivery].base_dir`.
    pub path: PathBuf,
    /// Write one structured file instead of one file per field.
    pub single_file: bool,
    /// Explicit single-file name. Derived when absent.
    pub file_basename: Option<String>,
    /// Appended to every file name in multi-file layout.
    pub files_suffix: Option<String>,
}

impl DirectoryRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            single_file: false,
            file_basename: None,
            files_suffix: None,
        }
    }

    pub fn single_file(mut self, basename: Option<String>) -> Self {
        self.single_file = true;
        self.file_basename = basename;
        self
    }

    pub fn files_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.files_suffix = Some(suffix.into());
        self
    }
}

/// Directory target after the channel has resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTarget {
    pub request: DirectoryRequest,
    /// Canonical absolute destination, set during delivery.
    pub resolved_path: Option<PathBuf>,
    /// Allowed parent the destination was matched against.
    pub allowed_parent_path: Option<PathBuf>,
}

/// Concrete delivery target carried by a command.
#[derive(Debug)]
pub enum ResultTarget {
    None,
    /// The handle is taken out when the single delivery is attempted.
    Callback(Option<CallbackHandle>),
    Directory(DirectoryTarget),
}

/// Delivery configuration of one command.
#[derive(Debug)]
pub struct ResultConfig {
    pub(crate) target: ResultTarget,
    /// Field names used to assemble the delivered message.
    pub keys: ResultKeys,
    pub(crate) delivery_attempted: bool,
}

impl ResultConfig {
    pub fn none() -> Self {
        Self::with_target(ResultTarget::None)
    }

    pub fn callback(handle: CallbackHandle) -> Self {
        Self::with_target(ResultTarget::Callback(Some(handle)))
    }

    pub fn directory(request: DirectoryRequest) -> Self {
        Self::with_target(ResultTarget::Directory(DirectoryTarget {
            request,
            resolved_path: None,
            allowed_parent_path: None,
        }))
    }

    fn with_target(target: ResultTarget) -> Self {
        Self {
            target,
            keys: ResultKeys::V1,
            delivery_attempted: false,
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self.target {
            ResultTarget::None => DeliveryMode::None,
            ResultTarget::Callback(_) => DeliveryMode::Callback,
            ResultTarget::Directory(_) => DeliveryMode::Directory,
        }
    }

    pub fn target(&self) -> &ResultTarget {
        &self.target
    }

    /// Whether the one allowed delivery attempt has been spent.
    pub fn delivery_attempted(&self) -> bool {
        self.delivery_attempted
    }

    pub fn directory_target(&self) -> Option<&DirectoryTarget> {
        match &self.target {
            ResultTarget::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub(crate) fn directory_target_mut(&mut self) -> Option<&mut DirectoryTarget> {
        match &mut self.target {
            ResultTarget::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub(crate) fn take_callback_handle(&mut self) -> Option<CallbackHandle> {
        match &mut self.target {
            ResultTarget::Callback(handle) => handle.take(),
            _ => None,
        }
    }
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self::none()
    }
}
