//! Notification payload and severity levels
//!
//! A [`NotifyMessage`] is the only thing watchers hand to the delivery side. It
//! serializes to the `{"summary": ..., "body": ...}` document the webhook expects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single human-readable notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyMessage {
    /// One-line headline, prefixed with a severity marker when one applies
    pub summary: String,
    /// Free-form details
    pub body: String,
}

impl NotifyMessage {
    pub fn new(summary: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            body: body.into(),
        }
    }

    /// Build a message whose summary reads `"<marker>Level: headline"`
    pub fn with_severity(severity: Severity, headline: &str, body: impl Into<String>) -> Self {
        Self::new(
            format!("{}{}: {}", severity.marker(), severity, headline),
            body,
        )
    }
}

impl fmt::Display for NotifyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// Severity of a notification, used only to pick the summary marker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something changed that an operator should look at
    Warning,
    /// Something is broken
    Error,
}

impl Severity {
    /// Map a Kubernetes event type (`Warning`, `Error`, ...) to a severity,
    /// case-insensitively. Unrecognised types have no severity.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type.to_lowercase().as_str() {
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }

    /// Emoji marker (with trailing space) put in front of summaries
    pub fn marker(self) -> &'static str {
        match self {
            Severity::Warning => "🟡 ",
            Severity::Error => "🔴 ",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
        }
    }
}
