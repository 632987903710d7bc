//! Self-monitoring counters for the poll loop
//!
//! Tracks how many poll cycles succeeded or failed and how many notifications
//! were delivered, so that a webhook that silently rejects everything shows up
//! in the process logs.

use chrono::{DateTime, Utc};
use log::{info, warn};

/// Delivery success rate below which a warning is logged
const LOW_SUCCESS_RATE: f64 = 90.0;

/// Counters accumulated over the lifetime of the process
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    /// Poll cycles that fetched state and ran every watcher
    pub cycles_completed: u64,
    /// Poll cycles abandoned because fetching state failed
    pub cycles_failed: u64,
    /// Notifications accepted by the notifier
    pub notifications_delivered: u64,
    /// Notifications the notifier failed to deliver
    pub notifications_failed: u64,
    /// When the last cycle completed
    pub last_success: Option<DateTime<Utc>>,
}

impl PollStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle_success(&mut self) {
        self.cycles_completed += 1;
        self.last_success = Some(Utc::now());
    }

    pub fn record_cycle_failure(&mut self) {
        self.cycles_failed += 1;
    }

    pub fn record_notification_result(&mut self, success: bool) {
        if success {
            self.notifications_delivered += 1;
        } else {
            self.notifications_failed += 1;
        }
    }

    /// Percentage (0-100) of notifications delivered; 100 when none were attempted
    pub fn notification_success_rate(&self) -> f64 {
        let attempted = self.notifications_delivered + self.notifications_failed;
        if attempted == 0 {
            return 100.0;
        }
        (self.notifications_delivered as f64 / attempted as f64) * 100.0
    }

    /// Log a one-line summary, warning when deliveries keep failing
    pub fn log_summary(&self) {
        let last_success = self
            .last_success
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());

        info!(
            "Poll stats: cycles_ok={}, cycles_failed={}, delivered={}, failed={}, last_success={}",
            self.cycles_completed,
            self.cycles_failed,
            self.notifications_delivered,
            self.notifications_failed,
            last_success
        );

        if self.notifications_failed > 0 && self.notification_success_rate() < LOW_SUCCESS_RATE {
            warn!(
                "Low notification success rate: {:.1}%",
                self.notification_success_rate()
            );
        }
    }
}
