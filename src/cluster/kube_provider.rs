use crate::cluster::{ClusterEvent, ClusterProvider, PodSnapshot};
use crate::error::ClusterError;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// [`ClusterProvider`] that lists pods and events through the Kubernetes API
///
/// The kube client is async; every call blocks on the shared runtime so the
/// poll loop itself stays synchronous.
pub struct KubeProvider {
    client: Client,
    runtime: Arc<Runtime>,
}

impl KubeProvider {
    /// Build a client from an explicit kubeconfig file, or from the default
    /// sources (in-cluster service account, then `~/.kube/config`)
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::ClientSetup` if no usable configuration is found.
    pub fn connect(runtime: Arc<Runtime>, kubeconfig: Option<&Path>) -> Result<Self, ClusterError> {
        let client = runtime.block_on(init_client(kubeconfig.map(Path::to_path_buf)))?;
        info!("Connected to Kubernetes API");

        Ok(Self { client, runtime })
    }
}

async fn init_client(kubeconfig: Option<PathBuf>) -> Result<Client, ClusterError> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(&path).map_err(|e| {
                ClusterError::ClientSetup(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;

            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    ClusterError::ClientSetup(format!(
                        "invalid kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;

            Client::try_from(config).map_err(|e| ClusterError::ClientSetup(e.to_string()))
        }
        None => Client::try_default()
            .await
            .map_err(|e| ClusterError::ClientSetup(e.to_string())),
    }
}

impl ClusterProvider for KubeProvider {
    fn list_pods(&self, namespace: &str) -> Result<Vec<PodSnapshot>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = self
            .runtime
            .block_on(api.list(&ListParams::default()))
            .map_err(|source| ClusterError::ListFailed {
                resource: "pods",
                namespace: namespace.to_string(),
                source,
            })?;

        debug!("Listed {} pods in namespace {}", pods.items.len(), namespace);

        Ok(pods
            .items
            .iter()
            .filter_map(|pod| {
                let snapshot = PodSnapshot::from_pod(pod);
                if snapshot.is_none() {
                    warn!(
                        "Ignoring pod without uid: {:?}",
                        pod.metadata.name.as_deref().unwrap_or("<unnamed>")
                    );
                }
                snapshot
            })
            .collect())
    }

    fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>, ClusterError> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let events = self
            .runtime
            .block_on(api.list(&ListParams::default()))
            .map_err(|source| ClusterError::ListFailed {
                resource: "events",
                namespace: namespace.to_string(),
                source,
            })?;

        debug!(
            "Listed {} events in namespace {}",
            events.items.len(),
            namespace
        );

        Ok(events
            .items
            .iter()
            .filter_map(|event| {
                let converted = ClusterEvent::from_event(event);
                if converted.is_none() {
                    warn!(
                        "Ignoring event without uid: {:?}",
                        event.metadata.name.as_deref().unwrap_or("<unnamed>")
                    );
                }
                converted
            })
            .collect())
    }
}
