use crate::cluster::{ClusterState, PodSnapshot};
use crate::message::{NotifyMessage, Severity};
use crate::watchers::{WatchedResource, Watcher};
use log::{debug, info};

/// Label Vault's service registration puts on the current leader
pub const ACTIVE_LABEL: &str = "vault-active";

/// Checks that exactly one pod is labelled `vault-active=true` and reports
/// when leadership moves to another pod
pub struct VaultActiveWatcher {
    namespace: String,
    /// Name of the last pod confirmed as the single active one
    last_active: Option<String>,
}

impl VaultActiveWatcher {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            last_active: None,
        }
    }

    pub fn last_active(&self) -> Option<&str> {
        self.last_active.as_deref()
    }

    /// Process one poll's worth of pods
    pub fn diff_pods(&mut self, pods: &[PodSnapshot]) -> Vec<NotifyMessage> {
        let active: Vec<&PodSnapshot> = pods
            .iter()
            .filter(|pod| pod.has_label(ACTIVE_LABEL, "true"))
            .collect();

        match active.as_slice() {
            [] => vec![NotifyMessage::with_severity(
                Severity::Error,
                "No vault pod is marked as active",
                format!("Vault deployment is broken (namespace={})", self.namespace),
            )],
            [pod] => self.observe_single_active(&pod.name),
            claimants => {
                let body = claimants
                    .iter()
                    .map(|pod| format!("marked as active: {}", pod.name))
                    .collect::<Vec<_>>()
                    .join("\n");
                vec![NotifyMessage::with_severity(
                    Severity::Warning,
                    "More than one pod is marked as active",
                    body,
                )]
            }
        }
    }

    fn observe_single_active(&mut self, name: &str) -> Vec<NotifyMessage> {
        match self.last_active.as_deref() {
            None => {
                info!("Active vault pod in namespace={} is {}", self.namespace, name);
                self.last_active = Some(name.to_string());
                Vec::new()
            }
            Some(previous) if previous == name => {
                debug!("Active vault pod unchanged: {}", name);
                Vec::new()
            }
            Some(previous) => {
                let message = NotifyMessage::with_severity(
                    Severity::Warning,
                    "The active vault pod changed",
                    format!(
                        "Old active: {}\nNew active: {}\nVault was probably down for some short time",
                        previous, name
                    ),
                );
                self.last_active = Some(name.to_string());
                vec![message]
            }
        }
    }
}

impl Watcher for VaultActiveWatcher {
    fn name(&self) -> &str {
        "VaultActiveWatcher"
    }

    fn resource(&self) -> WatchedResource {
        WatchedResource::Pods
    }

    fn diff(&mut self, state: &ClusterState) -> Vec<NotifyMessage> {
        self.diff_pods(&state.pods)
    }
}
