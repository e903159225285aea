// src/connection/host.rs

//! Execution host abstraction.
//!
//! The connection manager hands admitted commands to an `ExecutionHost`
//! instead of running them itself. How the host runs a command is outside
//! this crate; it is expected to move the command through `Executing` and
//! `Executed` and then hand it to the `FailureReporter` (or `ResultChannel`).

use tokio::sync::mpsc;
use tracing::debug;

use crate::command::ExecutionCommand;
use crate::errors::{ExecError, Result};

/// Trait abstracting the privileged, long-lived component that runs commands.
///
/// `submit` must not block: it only hands the command over.
pub trait ExecutionHost: Send + Sync {
    fn submit(&self, command: ExecutionCommand) -> Result<()>;
}

/// Host endpoint backed by a bounded mpsc channel.
///
/// The receiving half is owned by whatever task actually runs the commands.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::Sender<ExecutionCommand>,
}

impl ChannelHost {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ExecutionCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ExecutionHost for ChannelHost {
    fn submit(&self, command: ExecutionCommand) -> Result<()> {
        let id = command.id();
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ExecError::HostRejected(format!("host queue is full, execution {id} not accepted"))
            }
            mpsc::error::TrySendError::Closed(_) => {
                ExecError::HostRejected(format!("host has stopped, execution {id} not accepted"))
            }
        })?;
        debug!(execution_id = %id, "command handed to host queue");
        Ok(())
    }
}
