// src/connection/mod.rs

//! Connection to the execution host and command admission.

pub mod host;
pub mod listener;
pub mod manager;
pub mod signals;

pub use host::{ChannelHost, ExecutionHost};
pub use listener::{ConnectionListener, ListenerId};
pub use manager::{ConnectionManager, ConnectionState, ConnectionStatus, FIRST_EXECUTION_ID};
pub use signals::{spawn_signal_loop, HostSignal};
