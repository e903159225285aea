// src/connection/listener.rs

/// Observer of connection availability.
///
/// `on_ready` is called once per connection instance, after the binding
/// handshake; `on_lost` when that connection goes away.
pub trait ConnectionListener: Send + Sync {
    fn on_ready(&self);
    fn on_lost(&self);
}

/// Handle returned by `ConnectionManager::subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
