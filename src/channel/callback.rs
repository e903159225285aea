// src/channel/callback.rs

//! Single-use callback capabilities.
//!
//! A [`CallbackHandle`] stands for "the right to invoke the requester's
//! result endpoint once". The handle itself carries no function pointer; it
//! names an entry in the [`CallbackRegistry`], and invoking it removes that
//! entry. A second invocation, or one after the requester cancelled, finds
//! nothing and fails with `DeliveryFailed`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::channel::message::ResultEnvelope;
use crate::errors::{ExecError, Result};
use crate::ids::IdSource;
use crate::types::ExecutionId;

/// Delivery as seen by the requester's endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResult {
    /// Tag attached when the capability was registered.
    pub execution_id: Option<ExecutionId>,
    pub envelope: Option<ResultEnvelope>,
}

/// Requester-side endpoint a callback delivers into.
///
/// Returning an error means the transport rejected the message.
pub trait ResultEndpoint: Send + Sync {
    fn on_result(&self, inbound: InboundResult) -> Result<()>;
}

/// Opaque one-shot capability. Deliberately neither `Clone` nor `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct CallbackHandle {
    execution_id: ExecutionId,
    token: u64,
}

impl CallbackHandle {
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }
}

struct Registration {
    token: u64,
    endpoint: Arc<dyn ResultEndpoint>,
}

/// Table of live callback capabilities keyed by execution id.
pub struct CallbackRegistry {
    entries: Mutex<HashMap<ExecutionId, Registration>>,
    tokens: IdSource,
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            tokens: IdSource::starting_at(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ExecutionId, Registration>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `endpoint` as the destination for `execution_id`.
    ///
    /// Registering the same id again revokes the previous capability.
    pub fn register(
        &self,
        execution_id: ExecutionId,
        endpoint: Arc<dyn ResultEndpoint>,
    ) -> CallbackHandle {
        let token = self.tokens.next();
        let previous = self
            .lock()
            .insert(execution_id, Registration { token, endpoint });
        if previous.is_some() {
            warn!(%execution_id, "replaced an existing callback registration");
        }
        debug!(%execution_id, token, "registered callback capability");
        CallbackHandle {
            execution_id,
            token,
        }
    }

    /// Revoke the capability for `execution_id`, e.g. because the requester
    /// went away. Returns whether one was pending.
    pub fn cancel(&self, execution_id: ExecutionId) -> bool {
        let removed = self.lock().remove(&execution_id).is_some();
        if removed {
            debug!(%execution_id, "cancelled callback capability");
        }
        removed
    }

    pub fn is_pending(&self, execution_id: ExecutionId) -> bool {
        self.lock().contains_key(&execution_id)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Consume `handle` and deliver `envelope` to its endpoint.
    pub fn invoke(&self, handle: CallbackHandle, envelope: ResultEnvelope) -> Result<()> {
        let execution_id = handle.execution_id;

        // Remove under the lock, call the endpoint outside it.
        let registration = {
            let mut entries = self.lock();
            let current_token = entries.get(&execution_id).map(|reg| reg.token);
            match current_token {
                Some(token) if token == handle.token => entries.remove(&execution_id),
                Some(_) => {
                    return Err(ExecError::DeliveryFailed(format!(
                        "callback handle for execution {execution_id} was superseded"
                    )));
                }
                None => None,
            }
        };

        let Some(registration) = registration else {
            return Err(ExecError::DeliveryFailed(format!(
                "callback target for execution {execution_id} no longer exists or was cancelled"
            )));
        };

        registration
            .endpoint
            .on_result(InboundResult {
                execution_id: Some(execution_id),
                envelope: Some(envelope),
            })
            .map_err(|e| {
                ExecError::DeliveryFailed(format!(
                    "result endpoint rejected execution {execution_id}: {e}"
                ))
            })
    }
}
