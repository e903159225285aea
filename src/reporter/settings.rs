// src/reporter/settings.rs

use std::sync::atomic::{AtomicBool, Ordering};

/// Source of the user's "show error notifications" preference.
///
/// Read on every report, so a runtime toggle takes effect immediately.
pub trait NotificationSettings: Send + Sync {
    fn error_notifications_enabled(&self) -> bool;
}

/// A runtime-togglable switch, e.g. bound to a settings screen.
impl NotificationSettings for AtomicBool {
    fn error_notifications_enabled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}
