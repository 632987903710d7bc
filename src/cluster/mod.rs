/// Snapshot types converted from Kubernetes objects
pub mod types;

/// Provider backed by the Kubernetes API
pub mod kube_provider;

pub use kube_provider::KubeProvider;
pub use types::{ClusterEvent, ContainerSnapshot, ContainerState, PodSnapshot};

use crate::error::ClusterError;

/// Source of the current state of a namespace
///
/// Calls block until the data is available. Authentication and session handling
/// belong to the implementation.
#[cfg_attr(test, mockall::automock)]
pub trait ClusterProvider {
    /// List all pods in the namespace
    fn list_pods(&self, namespace: &str) -> Result<Vec<PodSnapshot>, ClusterError>;

    /// List all events in the namespace
    fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>, ClusterError>;
}

/// Everything fetched during a single poll cycle
#[derive(Debug, Clone, Default)]
pub struct ClusterState {
    pub pods: Vec<PodSnapshot>,
    pub events: Vec<ClusterEvent>,
}
