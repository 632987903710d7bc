//! Configuration loading and resolution
//!
//! Settings come from two places: an optional YAML file and the command line
//! (flags or their environment variables). Command-line values win; watchers
//! named on the command line are appended after the ones from the file.

use crate::error::ConfigError;
use crate::watchers::WatcherKind;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File the in-cluster service account exposes its namespace in
pub const SERVICE_ACCOUNT_NAMESPACE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Namespace used when nothing else says otherwise
pub const DEFAULT_NAMESPACE: &str = "default";

/// Contents of the YAML configuration file
///
/// ```yaml
/// namespace: vault
/// notify_url: https://hooks.example/notify
/// watchers:
///   - watcher: EventWatcher
///     exclude: ["debug-.*"]
///   - watcher: VaultActiveWatcher
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub namespace: Option<String>,
    pub notify_url: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    #[serde(default)]
    pub watchers: Vec<WatcherSpec>,
}

/// One enabled watcher and its options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WatcherSpec {
    pub watcher: WatcherKind,
    /// Full-match regular expressions for object names to ignore
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read and
    /// `ConfigError::YamlError` if it is not valid configuration.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Values given on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub notify_url: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub watchers: Vec<WatcherKind>,
    /// Exclusion patterns applied to every watcher named on the command line
    pub exclude: Vec<String>,
    pub dry_run: bool,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub namespace: String,
    /// Webhook endpoint; `None` only in dry-run mode
    pub notify_url: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub watchers: Vec<WatcherSpec>,
}

impl Settings {
    /// Merge file configuration with overrides and validate the result
    ///
    /// `detected_namespace` is the namespace of the running service account, if
    /// any; it is used when neither the overrides nor the file name one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when no watcher is enabled, when no
    /// notification URL is available outside dry-run mode, or when the URL is
    /// not a valid http(s) URL.
    pub fn resolve(
        file: Config,
        overrides: Overrides,
        detected_namespace: Option<String>,
    ) -> Result<Self, ConfigError> {
        let namespace = overrides
            .namespace
            .or(file.namespace)
            .or(detected_namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let notify_url = if overrides.dry_run {
            None
        } else {
            let url = overrides.notify_url.or(file.notify_url).ok_or_else(|| {
                ConfigError::ValidationError(
                    "Missing notification url. Provide --notify-url, NOTIFY_URL or notify_url in the config file"
                        .to_string(),
                )
            })?;
            validate_url(&url)?;
            Some(url)
        };

        let mut watchers = file.watchers;
        watchers.extend(overrides.watchers.into_iter().map(|watcher| WatcherSpec {
            watcher,
            exclude: overrides.exclude.clone(),
        }));

        if watchers.is_empty() {
            return Err(ConfigError::ValidationError(
                "No watchers configured. Name at least one of EventWatcher, PodWatcher, VaultActiveWatcher"
                    .to_string(),
            ));
        }

        let settings = Self {
            namespace,
            notify_url,
            kubeconfig: overrides.kubeconfig.or(file.kubeconfig),
            watchers,
        };
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::ValidationError(format!("Invalid notification url '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::ValidationError(format!(
            "Notification url must use http or https, got '{}'",
            other
        ))),
    }
}

/// Read the namespace of the running service account from `path`
///
/// Returns `None` when the file is missing or blank, e.g. outside a cluster.
pub fn detect_namespace(path: &Path) -> Option<String> {
    let namespace = fs::read_to_string(path).ok()?;
    let namespace = namespace.trim();
    if namespace.is_empty() {
        None
    } else {
        Some(namespace.to_string())
    }
}
