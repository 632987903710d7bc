/// Error types for configuration, cluster access and delivery
pub mod error;

/// Notification messages and severities
pub mod message;

/// Cluster snapshots and the provider that fetches them
pub mod cluster;

/// Stateful watchers that diff successive snapshots
pub mod watchers;

/// Notification delivery
pub mod alerts;

/// Configuration management
pub mod config;

/// Self-monitoring counters for the poll loop
pub mod monitoring;

/// The poll-diff-notify loop
pub mod poller;

// Re-export commonly used types
pub use error::{ClusterError, ConfigError, NotifyError};
pub use message::{NotifyMessage, Severity};
pub use poller::Poller;
