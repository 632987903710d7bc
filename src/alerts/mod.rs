/// Notification delivery backends
pub mod webhook;

pub use webhook::WebhookNotifier;

use crate::error::NotifyError;
use crate::message::NotifyMessage;
use log::info;

/// Delivers a single notification
///
/// Delivery is best effort: callers log failures and move on to the next message.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError>;
}

/// Notifier that only logs messages, for dry runs
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError> {
        info!("DRY RUN NOTIFICATION - Summary: {}, Body: {}", message.summary, message.body);
        Ok(())
    }
}
