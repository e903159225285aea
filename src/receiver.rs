// src/receiver.rs

//! Caller-side endpoint for callback-mode results.
//!
//! The [`ResultReceiver`] is what callback capabilities point at. For every
//! inbound result it logs a summary and republishes the message on a local
//! broadcast channel, so every in-process subscriber sees it. Results that
//! carry no id, or an id nobody is waiting for, are logged and dropped.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::channel::callback::{InboundResult, ResultEndpoint};
use crate::channel::message::{ResultKeys, ResultMessage};
use crate::errors::Result;
use crate::types::ExecutionId;

/// Topic every local result event is tagged with.
pub const RESULT_TOPIC: &str = "cmdrelay.result_broadcast";

/// Key the message is stored under inside a [`ResultEvent`].
pub const RESULT_BUNDLE_KEY: &str = ResultKeys::V1.result;

const DEFAULT_CAPACITY: usize = 64;

/// Local fan-out event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    pub topic: &'static str,
    pub execution_id: ExecutionId,
    pub bundle_key: &'static str,
    pub message: ResultMessage,
}

pub struct ResultReceiver {
    tx: broadcast::Sender<ResultEvent>,
    expected: Mutex<HashSet<ExecutionId>>,
}

impl std::fmt::Debug for ResultReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultReceiver")
            .field("subscribers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Default for ResultReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultReceiver {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// missing events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            expected: Mutex::new(HashSet::new()),
        }
    }

    fn expected(&self) -> MutexGuard<'_, HashSet<ExecutionId>> {
        self.expected.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Start accepting a result for `execution_id`.
    pub fn expect(&self, execution_id: ExecutionId) {
        self.expected().insert(execution_id);
    }

    /// Stop waiting for `execution_id`; a late result will be dropped.
    pub fn forget(&self, execution_id: ExecutionId) -> bool {
        self.expected().remove(&execution_id)
    }

    pub fn is_expecting(&self, execution_id: ExecutionId) -> bool {
        self.expected().contains(&execution_id)
    }

    /// Subscribe to every result event. Only events published after this
    /// call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<ResultEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to the events of a single execution.
    pub fn subscribe_for(&self, execution_id: ExecutionId) -> ResultSubscription {
        ResultSubscription {
            execution_id,
            rx: self.tx.subscribe(),
        }
    }

    /// Handle an inbound result. Returns whether it was republished.
    pub fn receive(&self, inbound: InboundResult) -> bool {
        let Some(execution_id) = inbound.execution_id else {
            warn!("dropping result without an execution id");
            return false;
        };
        let Some(envelope) = inbound.envelope else {
            warn!(%execution_id, "dropping result without a \"{RESULT_BUNDLE_KEY}\" message");
            return false;
        };
        if !self.expected().remove(&execution_id) {
            warn!(%execution_id, "dropping result for unknown or abandoned execution");
            return false;
        }

        let message = envelope.result;
        info!(%execution_id, "received execution result");
        debug!(
            %execution_id,
            stdout = %message.stdout,
            stdout_original_length = message.stdout_original_length,
            stderr = %message.stderr,
            stderr_original_length = message.stderr_original_length,
            exit_code = ?message.exit_code,
            err = message.err,
            errmsg = %message.errmsg,
            "execution result"
        );

        let event = ResultEvent {
            topic: RESULT_TOPIC,
            execution_id,
            bundle_key: RESULT_BUNDLE_KEY,
            message,
        };
        match self.tx.send(event) {
            Ok(listeners) => {
                debug!(%execution_id, listeners, "published result event");
            }
            Err(_) => {
                debug!(%execution_id, "no local listeners for result event");
            }
        }
        true
    }
}

impl ResultEndpoint for ResultReceiver {
    fn on_result(&self, inbound: InboundResult) -> Result<()> {
        self.receive(inbound);
        Ok(())
    }
}

/// Broadcast receiver filtered to one execution id.
#[derive(Debug)]
pub struct ResultSubscription {
    execution_id: ExecutionId,
    rx: broadcast::Receiver<ResultEvent>,
}

impl ResultSubscription {
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// Wait for the next event of this execution. `None` once the receiver
    /// has been dropped.
    pub async fn recv(&mut self) -> Option<ResultEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.execution_id == self.execution_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(execution_id = %self.execution_id, skipped, "result subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
