use crate::cluster::{ClusterState, ContainerSnapshot, PodSnapshot};
use crate::message::{NotifyMessage, Severity};
use crate::watchers::{ExclusionFilter, WatchedResource, Watcher};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Reports containers that became not-ready or restarted since the last poll
///
/// Pods are tracked by UID. The first sighting of a pod only records a
/// baseline; later polls compare container statuses position by position
/// against the previous observation of the same pod.
pub struct PodWatcher {
    namespace: String,
    exclude: ExclusionFilter,
    last_pods: HashMap<String, PodSnapshot>,
}

impl PodWatcher {
    pub fn new(namespace: impl Into<String>, exclude: ExclusionFilter) -> Self {
        Self {
            namespace: namespace.into(),
            exclude,
            last_pods: HashMap::new(),
        }
    }

    /// Number of pods with a recorded baseline
    pub fn tracked_count(&self) -> usize {
        self.last_pods.len()
    }

    pub fn is_tracking(&self, uid: &str) -> bool {
        self.last_pods.contains_key(uid)
    }

    /// Process one poll's worth of pods
    pub fn diff_pods(&mut self, pods: &[PodSnapshot]) -> Vec<NotifyMessage> {
        let mut messages = Vec::new();

        for pod in pods {
            if self.exclude.should_exclude(&pod.name) {
                info!(
                    "Not notifying for {} because it matched an exclude pattern",
                    pod.name
                );
                continue;
            }

            let Some(previous) = self.last_pods.insert(pod.uid.clone(), pod.clone()) else {
                debug!("Registered new pod {} ({})", pod.name, pod.uid);
                continue;
            };

            // Positional pairing: containers beyond the shorter list are not compared
            for (old, new) in previous.containers.iter().zip(&pod.containers) {
                if old.name != new.name {
                    warn!(
                        "Container names do not match in pod {}: old={} new={}",
                        pod.name, old.name, new.name
                    );
                    continue;
                }

                if !new.ready && !new.completed_successfully() {
                    debug!("Container not ready: new={:?} old={:?}", new, old);
                    messages.push(self.not_ready_message(&pod.name, new));
                }

                if new.restart_count > old.restart_count {
                    debug!("Container restarted: new={:?} old={:?}", new, old);
                    messages.push(self.restarted_message(&pod.name, old, new));
                }
            }
        }

        self.forget_missing(pods);
        messages
    }

    /// Drop baselines of pods that are no longer listed; a pod UID is never reused
    fn forget_missing(&mut self, pods: &[PodSnapshot]) {
        let current: HashSet<&str> = pods.iter().map(|pod| pod.uid.as_str()).collect();
        let before = self.last_pods.len();
        self.last_pods.retain(|uid, _| current.contains(uid.as_str()));

        let removed = before - self.last_pods.len();
        if removed > 0 {
            debug!("Forgot {} pods that left namespace={}", removed, self.namespace);
        }
    }

    fn not_ready_message(&self, pod_name: &str, container: &ContainerSnapshot) -> NotifyMessage {
        NotifyMessage::with_severity(
            Severity::Warning,
            &format!(
                "container {} in pod {} is not ready (namespace={})",
                container.name, pod_name, self.namespace
            ),
            container.status_report(),
        )
    }

    fn restarted_message(
        &self,
        pod_name: &str,
        old: &ContainerSnapshot,
        new: &ContainerSnapshot,
    ) -> NotifyMessage {
        NotifyMessage::with_severity(
            Severity::Warning,
            &format!(
                "container {} in pod {} was restarted (namespace={})",
                new.name, pod_name, self.namespace
            ),
            format!(
                "Old restart count={}, new restart count={}",
                old.restart_count, new.restart_count
            ),
        )
    }
}

impl Watcher for PodWatcher {
    fn name(&self) -> &str {
        "PodWatcher"
    }

    fn resource(&self) -> WatchedResource {
        WatchedResource::Pods
    }

    fn diff(&mut self, state: &ClusterState) -> Vec<NotifyMessage> {
        self.diff_pods(&state.pods)
    }
}
