pub mod builders;
pub mod fake_host;
pub mod presenter;

use std::sync::{Arc, Once};

use cmdrelay::config::RelayConfig;
use cmdrelay::fs::FileSystem;
use cmdrelay::Relay;
use tracing_subscriber::{fmt, EnvFilter};

use crate::fake_host::FakeHost;
use crate::presenter::RecordingPresenter;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A relay wired to a fake host and a recording presenter.
pub struct TestRelay {
    pub relay: Relay,
    pub host: Arc<FakeHost>,
    pub presenter: Arc<RecordingPresenter>,
}

impl TestRelay {
    /// Relay on the real filesystem, not yet connected.
    pub fn new(config: RelayConfig) -> Self {
        let presenter = Arc::new(RecordingPresenter::new());
        Self {
            relay: Relay::new(config, presenter.clone()),
            host: Arc::new(FakeHost::new()),
            presenter,
        }
    }

    pub fn with_fs(config: RelayConfig, fs: Arc<dyn FileSystem>) -> Self {
        let presenter = Arc::new(RecordingPresenter::new());
        Self {
            relay: Relay::with_fs(config, presenter.clone(), fs),
            host: Arc::new(FakeHost::new()),
            presenter,
        }
    }

    /// Drive the manager through connect, connected and bound.
    pub fn connect_and_bind(&self) {
        let manager = self.relay.manager();
        manager.connect();
        manager.on_host_connected(self.host.clone());
        manager.on_host_bound();
    }

    /// Convenience: a fresh relay that is ready to admit commands.
    pub fn ready(config: RelayConfig) -> Self {
        let t = Self::new(config);
        t.connect_and_bind();
        t
    }
}
