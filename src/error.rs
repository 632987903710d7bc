use thiserror::Error;

/// Errors that can occur while talking to the Kubernetes API
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Failed to create Kubernetes client: {0}")]
    ClientSetup(String),

    #[error("Failed to list {resource} in namespace {namespace}: {source}")]
    ListFailed {
        resource: &'static str,
        namespace: String,
        #[source]
        source: kube::Error,
    },
}

/// Errors that can occur when delivering notifications
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to send notification: {0}")]
    TransportFailed(#[from] reqwest::Error),

    #[error("Webhook rejected notification with status {status}")]
    Rejected { status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    ClientSetup(String),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown watcher '{0}' (expected EventWatcher, PodWatcher or VaultActiveWatcher)")]
    UnknownWatcher(String),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}
