// src/connection/manager.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::channel::callback::{CallbackRegistry, ResultEndpoint};
use crate::command::{CommandRequest, DeliveryRequest, ExecutionCommand, ResultConfig};
use crate::config::RelayConfig;
use crate::errors::{ExecError, Result};
use crate::ids::IdSource;
use crate::receiver::ResultReceiver;
use crate::types::ExecutionId;

use super::host::ExecutionHost;
use super::listener::{ConnectionListener, ListenerId};

/// First execution id handed out by a fresh manager.
pub const FIRST_EXECUTION_ID: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot published to `status_receiver` subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Binding handshake completed for the current connection.
    pub bound: bool,
    /// Incremented for every new connection instance.
    pub generation: u64,
}

impl ConnectionStatus {
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected && self.bound
    }
}

struct ListenerEntry {
    id: ListenerId,
    listener: Arc<dyn ConnectionListener>,
    /// Generation this listener last got `on_ready` for.
    notified_generation: Option<u64>,
}

struct Inner {
    state: ConnectionState,
    bound: bool,
    generation: u64,
    host: Option<Arc<dyn ExecutionHost>>,
    listeners: Vec<ListenerEntry>,
}

impl Inner {
    fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            bound: self.bound,
            generation: self.generation,
        }
    }

    /// Listeners that have not seen `on_ready` for the current generation,
    /// marked as notified.
    fn take_ready_listeners(&mut self) -> Vec<Arc<dyn ConnectionListener>> {
        let generation = self.generation;
        self.listeners
            .iter_mut()
            .filter(|entry| entry.notified_generation != Some(generation))
            .map(|entry| {
                entry.notified_generation = Some(generation);
                Arc::clone(&entry.listener)
            })
            .collect()
    }
}

/// Owner of the connection to the execution host.
///
/// One instance per process, shared by every requester through an `Arc`.
/// Host-side signals (`on_host_connected`, `on_host_bound`,
/// `on_host_disconnected`) drive the connection state; `execute` admits
/// commands against it without ever queueing them.
pub struct ConnectionManager {
    inner: Mutex<Inner>,
    status_tx: watch::Sender<ConnectionStatus>,
    execution_ids: IdSource,
    listener_ids: IdSource,
    callbacks: Arc<CallbackRegistry>,
    receiver: Arc<ResultReceiver>,
    bin_dir: Option<PathBuf>,
    allow_external_apps: bool,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("status", &self.status())
            .field("next_execution_id", &self.execution_ids.peek())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(
        callbacks: Arc<CallbackRegistry>,
        receiver: Arc<ResultReceiver>,
        bin_dir: Option<PathBuf>,
    ) -> Self {
        let inner = Inner {
            state: ConnectionState::Disconnected,
            bound: false,
            generation: 0,
            host: None,
            listeners: Vec::new(),
        };
        let (status_tx, _) = watch::channel(inner.status());
        Self {
            inner: Mutex::new(inner),
            status_tx,
            execution_ids: IdSource::starting_at(FIRST_EXECUTION_ID),
            listener_ids: IdSource::starting_at(1),
            callbacks,
            receiver,
            bin_dir,
            allow_external_apps: false,
        }
    }

    /// Admit (or refuse) requests marked `is_external_request`.
    pub fn with_external_apps_allowed(mut self, allow: bool) -> Self {
        self.allow_external_apps = allow;
        self
    }

    pub fn from_config(
        cfg: &RelayConfig,
        callbacks: Arc<CallbackRegistry>,
        receiver: Arc<ResultReceiver>,
    ) -> Self {
        Self::new(callbacks, receiver, cfg.connection.bin_dir.clone())
            .with_external_apps_allowed(cfg.connection.allow_external_apps)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Publish the current status. Called with the lock held so the watch
    /// channel never trails `Inner`.
    fn publish(&self, inner: &Inner) -> ConnectionStatus {
        let status = inner.status();
        self.status_tx.send_replace(status);
        status
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status()
    }

    /// Watch channel that always holds the latest status.
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Resolve once the host is connected and bound.
    ///
    /// Never times out on its own; wrap in `tokio::time::timeout` to bound it.
    pub async fn wait_until_ready(&self) {
        let mut rx = self.status_tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(ConnectionStatus::is_ready).await;
    }

    /// Begin establishing a connection.
    ///
    /// Returns `false` (and does nothing) if a connection is already
    /// outstanding or established.
    pub fn connect(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Disconnected {
                debug!(state = ?inner.state, "connect requested while a connection is outstanding; ignoring");
                return false;
            }
            inner.state = ConnectionState::Connecting;
            self.publish(&inner);
        }
        info!("connecting to execution host");
        true
    }

    /// Host-side signal: the connection is up. Binding is still pending.
    pub fn on_host_connected(&self, host: Arc<dyn ExecutionHost>) {
        let status = {
            let mut inner = self.lock();
            if inner.state == ConnectionState::Connected {
                warn!(generation = inner.generation, "host connected twice without a disconnect; ignoring");
                return;
            }
            inner.state = ConnectionState::Connected;
            inner.bound = false;
            inner.generation += 1;
            inner.host = Some(host);
            self.publish(&inner)
        };
        info!(generation = status.generation, "execution host connected");
    }

    /// Host-side signal: binding handshake completed. Fires `on_ready`.
    pub fn on_host_bound(&self) {
        let (status, to_notify) = {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Connected {
                warn!(state = ?inner.state, "bind signal without a connection; ignoring");
                return;
            }
            if inner.bound {
                debug!(generation = inner.generation, "host already bound");
                return;
            }
            inner.bound = true;
            (self.publish(&inner), inner.take_ready_listeners())
        };
        info!(generation = status.generation, "execution host bound");
        for listener in to_notify {
            listener.on_ready();
        }
    }

    /// Host-side signal: the connection went away. Fires `on_lost`.
    pub fn on_host_disconnected(&self) {
        let (status, was_connected, listeners) = {
            let mut inner = self.lock();
            if inner.state == ConnectionState::Disconnected {
                debug!("disconnect signal while already disconnected");
                return;
            }
            let was_connected = inner.state == ConnectionState::Connected;
            inner.state = ConnectionState::Disconnected;
            inner.bound = false;
            inner.host = None;
            let listeners: Vec<_> = inner
                .listeners
                .iter()
                .map(|entry| Arc::clone(&entry.listener))
                .collect();
            (self.publish(&inner), was_connected, listeners)
        };
        info!(generation = status.generation, "execution host disconnected");
        if was_connected {
            for listener in listeners {
                listener.on_lost();
            }
        }
    }

    /// Release the connection as part of process shutdown.
    pub fn shutdown(&self) {
        info!("closing connection to execution host");
        self.on_host_disconnected();
    }

    /// Register a connection listener.
    ///
    /// If the host is already ready, `on_ready` is invoked right away.
    pub fn subscribe(&self, listener: Arc<dyn ConnectionListener>) -> ListenerId {
        let id = ListenerId(self.listener_ids.next());
        let notify_now = {
            let mut inner = self.lock();
            let ready = inner.status().is_ready();
            let generation = inner.generation;
            inner.listeners.push(ListenerEntry {
                id,
                listener: Arc::clone(&listener),
                notified_generation: ready.then_some(generation),
            });
            ready
        };
        if notify_now {
            listener.on_ready();
        }
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|entry| entry.id != id);
        inner.listeners.len() != before
    }

    /// Admit `request` and hand it to the host.
    ///
    /// Returns the assigned execution id immediately; completion and
    /// delivery happen later on an independent path. Nothing is queued when
    /// the host is unavailable: the caller gets `NotConnected`/`NotReady`
    /// and is expected to retry after the ready signal.
    pub fn execute(&self, request: CommandRequest) -> Result<ExecutionId> {
        validate_request(&request)?;

        if request.is_external_request && !self.allow_external_apps {
            warn!(
                executable = %request.executable,
                "refusing external request since external apps are not allowed"
            );
            return Err(ExecError::ExternalAppsNotAllowed);
        }

        let host = {
            let inner = self.lock();
            match (inner.state, inner.bound, inner.host.as_ref()) {
                (ConnectionState::Connected, true, Some(host)) => Arc::clone(host),
                (ConnectionState::Connected, false, Some(_)) => {
                    warn!("execute called before the host finished binding");
                    return Err(ExecError::NotReady);
                }
                _ => {
                    warn!(state = ?inner.state, "execute called without a host connection");
                    return Err(ExecError::NotConnected);
                }
            }
        };

        let id = ExecutionId(self.execution_ids.next());
        let executable = resolve_executable(self.bin_dir.as_deref(), &request.executable);

        let result_config = match &request.delivery {
            DeliveryRequest::None => ResultConfig::none(),
            DeliveryRequest::Callback => {
                self.receiver.expect(id);
                let endpoint: Arc<dyn ResultEndpoint> = self.receiver.clone();
                ResultConfig::callback(self.callbacks.register(id, endpoint))
            }
            DeliveryRequest::Directory(dir) => ResultConfig::directory(dir.clone()),
        };
        let mode = result_config.mode();

        let command = ExecutionCommand::from_request(id, request, executable, result_config);
        let id_and_label = command.id_and_label();
        let command_line = command.command_line();

        if let Err(err) = host.submit(command) {
            warn!(execution_id = %id, error = %err, "{id_and_label}: host did not accept command");
            self.callbacks.cancel(id);
            self.receiver.forget(id);
            return Err(err);
        }

        info!(
            execution_id = %id,
            delivery = ?mode,
            command = %command_line,
            "{id_and_label}: command admitted"
        );
        Ok(id)
    }
}

fn validate_request(request: &CommandRequest) -> Result<()> {
    if request.executable.trim().is_empty() {
        return Err(ExecError::InvalidInput(
            "executable path must not be empty".to_string(),
        ));
    }
    if request.executable.contains('\0') {
        return Err(ExecError::InvalidInput(
            "executable path must not contain NUL bytes".to_string(),
        ));
    }
    if let Some(pos) = request.arguments.iter().position(|a| a.contains('\0')) {
        return Err(ExecError::InvalidInput(format!(
            "argument {pos} must not contain NUL bytes"
        )));
    }
    Ok(())
}

/// Prefix bare executable names with `bin_dir`.
fn resolve_executable(bin_dir: Option<&Path>, executable: &str) -> String {
    match bin_dir {
        Some(dir) if !executable.contains('/') => dir.join(executable).to_string_lossy().into_owned(),
        _ => executable.to_string(),
    }
}
