// src/relay.rs

//! Composition root.
//!
//! The embedding application owns exactly one [`Relay`] for the lifetime of
//! the process. It wires the callback registry, receiver, connection
//! manager, result channel and failure reporter together from one
//! [`RelayConfig`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::channel::{CallbackRegistry, ResultChannel};
use crate::config::{load_and_validate, RelayConfig};
use crate::connection::{spawn_signal_loop, ConnectionManager, HostSignal};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::init_logging;
use crate::receiver::ResultReceiver;
use crate::reporter::{AlertPresenter, FailureReporter};

pub struct Relay {
    config: RelayConfig,
    callbacks: Arc<CallbackRegistry>,
    receiver: Arc<ResultReceiver>,
    manager: Arc<ConnectionManager>,
    channel: Arc<ResultChannel>,
    reporter: Arc<FailureReporter>,
    notifications_enabled: Arc<AtomicBool>,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("manager", &self.manager)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl Relay {
    pub fn new(config: RelayConfig, presenter: Arc<dyn AlertPresenter>) -> Self {
        Self::with_fs(config, presenter, Arc::new(RealFileSystem))
    }

    pub fn with_fs(
        config: RelayConfig,
        presenter: Arc<dyn AlertPresenter>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let callbacks = Arc::new(CallbackRegistry::new());
        let receiver = Arc::new(ResultReceiver::new());
        let manager = Arc::new(ConnectionManager::from_config(
            &config,
            Arc::clone(&callbacks),
            Arc::clone(&receiver),
        ));
        let channel = Arc::new(ResultChannel::from_config(&config, Arc::clone(&callbacks), fs));
        let notifications_enabled = Arc::new(AtomicBool::new(
            config.notifications.error_notifications_enabled,
        ));
        let reporter = Arc::new(FailureReporter::new(
            Arc::clone(&channel),
            notifications_enabled.clone(),
            presenter,
        ));

        Self {
            config,
            callbacks,
            receiver,
            manager,
            channel,
            reporter,
            notifications_enabled,
        }
    }

    /// Load, validate and apply a config file, initialising logging from its
    /// `[logging]` section.
    pub fn from_config_file(
        path: impl AsRef<Path>,
        presenter: Arc<dyn AlertPresenter>,
    ) -> Result<Self> {
        let config = load_and_validate(path)?;
        init_logging(config.logging.level);
        Ok(Self::new(config, presenter))
    }

    /// Start connecting and spawn the host signal loop.
    ///
    /// The returned sender is given to the host-side link.
    pub fn start(&self) -> (mpsc::Sender<HostSignal>, JoinHandle<()>) {
        self.manager.connect();
        spawn_signal_loop(Arc::clone(&self.manager))
    }

    /// Tear down the connection; pending callbacks can no longer be served.
    pub fn shutdown(&self) {
        self.manager.shutdown();
        info!(
            pending_callbacks = self.callbacks.pending_count(),
            "relay shut down"
        );
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    pub fn receiver(&self) -> &Arc<ResultReceiver> {
        &self.receiver
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn channel(&self) -> &Arc<ResultChannel> {
        &self.channel
    }

    pub fn reporter(&self) -> &Arc<FailureReporter> {
        &self.reporter
    }

    /// Runtime toggle for the error-notifications preference.
    pub fn set_error_notifications_enabled(&self, enabled: bool) {
        self.notifications_enabled.store(enabled, Ordering::Relaxed);
    }
}
