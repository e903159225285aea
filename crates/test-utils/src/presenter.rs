use std::sync::Mutex;

use cmdrelay::reporter::{AlertPresenter, PersistentAlert};

/// Presenter that keeps everything it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    transients: Mutex<Vec<String>>,
    alerts: Mutex<Vec<PersistentAlert>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transients(&self) -> Vec<String> {
        self.transients.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<PersistentAlert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn is_silent(&self) -> bool {
        self.transients.lock().unwrap().is_empty() && self.alerts.lock().unwrap().is_empty()
    }
}

impl AlertPresenter for RecordingPresenter {
    fn show_transient(&self, text: &str) {
        self.transients.lock().unwrap().push(text.to_string());
    }

    fn raise_alert(&self, alert: PersistentAlert) {
        self.alerts.lock().unwrap().push(alert);
    }
}
