// ── Consecutive failure tracking ──

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Back-to-back failed fetches since the last success.
#[derive(Debug, Clone, Default)]
pub struct ErrorStreak {
    consecutive: u32,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<Arc<tcc_api::Error>>,
}

impl ErrorStreak {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    pub fn last_error(&self) -> Option<&Arc<tcc_api::Error>> {
        self.last_error.as_ref()
    }

    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.consecutive = 0;
        self.last_success = Some(at);
        self.last_error = None;
    }

    /// Count one failure and return the new streak length.
    pub fn record_failure(&mut self, error: Arc<tcc_api::Error>) -> u32 {
        self.consecutive = self.consecutive.saturating_add(1);
        self.last_error = Some(error);
        self.consecutive
    }

    /// `true` once the streak has reached `threshold`.
    pub fn reached(&self, threshold: u32) -> bool {
        self.consecutive >= threshold
    }
}
