// src/connection/signals.rs

//! Host signal loop.
//!
//! Whatever maintains the link to the execution host reports lifecycle
//! changes as [`HostSignal`]s over an mpsc channel. A background task feeds
//! them into the [`ConnectionManager`] in order, so connect/bind/disconnect
//! are always applied sequentially.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::host::ExecutionHost;
use super::manager::ConnectionManager;

/// Lifecycle events coming from the host side.
pub enum HostSignal {
    /// Link established; commands can be submitted once bound.
    Connected(Arc<dyn ExecutionHost>),
    /// Binding handshake completed.
    Bound,
    /// Link lost, or the host went away.
    Disconnected,
}

impl std::fmt::Debug for HostSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostSignal::Connected(_) => f.write_str("Connected"),
            HostSignal::Bound => f.write_str("Bound"),
            HostSignal::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// Spawn the background loop applying host signals to `manager`.
///
/// The returned sender is handed to the host-side link. The loop ends when
/// every sender has been dropped; the manager is then marked disconnected.
pub fn spawn_signal_loop(
    manager: Arc<ConnectionManager>,
) -> (mpsc::Sender<HostSignal>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<HostSignal>(16);

    let handle = tokio::spawn(async move {
        info!("host signal loop started");

        while let Some(signal) = rx.recv().await {
            debug!(?signal, "host signal");
            apply_signal(&manager, signal);
        }

        manager.on_host_disconnected();
        info!("host signal loop finished (channel closed)");
    });

    (tx, handle)
}

fn apply_signal(manager: &ConnectionManager, signal: HostSignal) {
    match signal {
        HostSignal::Connected(host) => manager.on_host_connected(host),
        HostSignal::Bound => manager.on_host_bound(),
        HostSignal::Disconnected => manager.on_host_disconnected(),
    }
}
