//! Stateful watchers that turn successive cluster snapshots into notifications
//!
//! Each watcher keeps its own memory of what it saw on previous polls and, on
//! every call to [`Watcher::diff`], reports only what changed since then.

pub mod event_watcher;
pub mod exclusion;
pub mod pod_watcher;
pub mod vault_active;

pub use event_watcher::EventWatcher;
pub use exclusion::ExclusionFilter;
pub use pod_watcher::PodWatcher;
pub use vault_active::VaultActiveWatcher;

use crate::cluster::ClusterState;
use crate::config::WatcherSpec;
use crate::error::ConfigError;
use crate::message::NotifyMessage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait implemented by every watcher variant
///
/// `diff` is called once per poll cycle with freshly fetched state. It updates
/// the watcher's snapshot and returns the notifications for this cycle, in the
/// order they should be delivered.
pub trait Watcher {
    /// Human-readable watcher name, used in logs
    fn name(&self) -> &str;

    /// Which part of the cluster state this watcher reads
    fn resource(&self) -> WatchedResource;

    /// Compare `state` with the previous snapshot and return new notifications
    fn diff(&mut self, state: &ClusterState) -> Vec<NotifyMessage>;
}

/// Cluster resource a watcher needs fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchedResource {
    Pods,
    Events,
}

/// The watcher variants that can be enabled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WatcherKind {
    #[serde(alias = "events")]
    EventWatcher,
    #[serde(alias = "pods")]
    PodWatcher,
    #[serde(alias = "vault_active")]
    VaultActiveWatcher,
}

impl WatcherKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WatcherKind::EventWatcher => "EventWatcher",
            WatcherKind::PodWatcher => "PodWatcher",
            WatcherKind::VaultActiveWatcher => "VaultActiveWatcher",
        }
    }
}

impl fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatcherKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EventWatcher" | "events" => Ok(WatcherKind::EventWatcher),
            "PodWatcher" | "pods" => Ok(WatcherKind::PodWatcher),
            "VaultActiveWatcher" | "vault_active" => Ok(WatcherKind::VaultActiveWatcher),
            other => Err(ConfigError::UnknownWatcher(other.to_string())),
        }
    }
}

/// Construct a watcher for `namespace` from its configuration entry
///
/// # Errors
///
/// Returns `ConfigError::InvalidPattern` if an exclusion pattern does not compile.
pub fn build_watcher(spec: &WatcherSpec, namespace: &str) -> Result<Box<dyn Watcher>, ConfigError> {
    let watcher: Box<dyn Watcher> = match spec.watcher {
        WatcherKind::EventWatcher => {
            Box::new(EventWatcher::new(namespace, exclusion_filter(spec)?))
        }
        WatcherKind::PodWatcher => Box::new(PodWatcher::new(namespace, exclusion_filter(spec)?)),
        WatcherKind::VaultActiveWatcher => {
            if !spec.exclude.is_empty() {
                warn!("VaultActiveWatcher ignores exclusion patterns {:?}", spec.exclude);
            }
            Box::new(VaultActiveWatcher::new(namespace))
        }
    };

    Ok(watcher)
}

fn exclusion_filter(spec: &WatcherSpec) -> Result<ExclusionFilter, ConfigError> {
    let filter = ExclusionFilter::new(&spec.exclude)?;
    if !filter.is_empty() {
        debug!("{} ignores names matching {} patterns", spec.watcher, filter.len());
    }
    Ok(filter)
}

/// Construct every configured watcher, preserving the configured order
///
/// # Errors
///
/// Fails on the first watcher whose exclusion patterns do not compile.
pub fn build_watchers(
    specs: &[WatcherSpec],
    namespace: &str,
) -> Result<Vec<Box<dyn Watcher>>, ConfigError> {
    specs
        .iter()
        .map(|spec| build_watcher(spec, namespace))
        .collect()
}
