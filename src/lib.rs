// src/lib.rs

//! Command admission and result delivery for a privileged execution host.
//!
//! A requester hands a [`CommandRequest`] to the [`ConnectionManager`],
//! which admits it (or refuses it outright) and forwards it to the host.
//! Once the host has run the command, the [`FailureReporter`] settles it:
//! the [`ResultChannel`] delivers the result exactly once (by callback or by
//! writing files), and failures nobody else will present become local alerts.
//! Callback results arrive at the [`ResultReceiver`], which fans them out to
//! in-process subscribers.

pub mod channel;
pub mod command;
pub mod config;
pub mod connection;
pub mod errors;
pub mod fs;
pub mod ids;
pub mod logging;
pub mod receiver;
pub mod relay;
pub mod reporter;
pub mod types;

pub use channel::{CallbackRegistry, ResultChannel, ResultEnvelope, ResultMessage};
pub use command::{CommandRequest, DeliveryRequest, DirectoryRequest, ExecutionCommand};
pub use config::RelayConfig;
pub use connection::{ConnectionManager, ExecutionHost, HostSignal};
pub use errors::{ExecError, Result};
pub use receiver::{ResultEvent, ResultReceiver};
pub use relay::Relay;
pub use reporter::{AlertPresenter, FailureReporter};
pub use types::{DeliveryMode, Errno, ExecutionId, ExecutionState, LogLevel};
