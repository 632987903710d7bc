//! Plain snapshots of the Kubernetes objects the watchers look at
//!
//! Watchers never see `k8s_openapi` types directly. The provider converts every
//! listed object into one of these owned snapshots, keeping only the fields the
//! diff algorithms need.

use k8s_openapi::api::core::v1::{ContainerStatus, Event, Pod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Kubernetes event as observed in one poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterEvent {
    /// Event object UID, the identity used for deduplication
    pub uid: String,
    /// Event type (`Normal`, `Warning`, ...). `Unknown` when the API left it empty
    pub event_type: String,
    /// Human readable event message
    pub message: String,
    /// Name of the object the event is about
    pub involved_name: String,
    /// Field path inside the involved object, e.g. `spec.containers{web}`
    pub field_path: String,
}

impl ClusterEvent {
    /// Event type that never produces notifications
    pub const NORMAL: &'static str = "Normal";

    /// Convert an API event. Returns `None` for events without a UID.
    pub fn from_event(event: &Event) -> Option<Self> {
        let uid = event.metadata.uid.clone()?;

        Some(Self {
            uid,
            event_type: event
                .type_
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            message: event.message.clone().unwrap_or_default(),
            involved_name: event.involved_object.name.clone().unwrap_or_default(),
            field_path: event.involved_object.field_path.clone().unwrap_or_default(),
        })
    }

    pub fn is_normal(&self) -> bool {
        self.event_type == Self::NORMAL
    }
}

/// Pod as observed in one poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSnapshot {
    pub uid: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Container statuses in the order the API reported them
    pub containers: Vec<ContainerSnapshot>,
}

impl PodSnapshot {
    /// Convert an API pod. Returns `None` for pods without a UID.
    ///
    /// Pods that have no status yet (or no container statuses) get an empty
    /// container list.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let uid = pod.metadata.uid.clone()?;

        let containers = pod
            .status
            .as_ref()
            .and_then(|status| status.container_statuses.as_ref())
            .map(|statuses| statuses.iter().map(ContainerSnapshot::from).collect())
            .unwrap_or_default();

        Some(Self {
            uid,
            name: pod.metadata.name.clone().unwrap_or_default(),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
            containers,
        })
    }

    /// Whether the pod carries `key=value` among its labels
    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }
}

/// Status of one container of a pod
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    pub state: ContainerState,
    /// The complete API status (image, last state, ...) as reported, `Null` if unavailable
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl ContainerSnapshot {
    /// Exit code if the container is currently terminated
    pub fn terminated_exit_code(&self) -> Option<i32> {
        match self.state {
            ContainerState::Terminated { exit_code, .. } => Some(exit_code),
            _ => None,
        }
    }

    /// Terminated with exit code 0, e.g. a finished init or job container
    pub fn completed_successfully(&self) -> bool {
        self.terminated_exit_code() == Some(0)
    }

    /// Pretty JSON of the full container status, or of this snapshot when the
    /// API status was not kept
    pub fn status_report(&self) -> String {
        let rendered = if self.details.is_null() {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string_pretty(&self.details)
        };
        rendered.unwrap_or_else(|_| format!("{:?}", self))
    }
}

impl From<&ContainerStatus> for ContainerSnapshot {
    fn from(status: &ContainerStatus) -> Self {
        let state = match status.state.as_ref() {
            Some(state) => {
                if let Some(terminated) = &state.terminated {
                    ContainerState::Terminated {
                        exit_code: terminated.exit_code,
                        reason: terminated.reason.clone(),
                    }
                } else if let Some(waiting) = &state.waiting {
                    ContainerState::Waiting {
                        reason: waiting.reason.clone(),
                    }
                } else if state.running.is_some() {
                    ContainerState::Running
                } else {
                    ContainerState::Unknown
                }
            }
            None => ContainerState::Unknown,
        };

        Self {
            name: status.name.clone(),
            ready: status.ready,
            restart_count: status.restart_count,
            state,
            details: serde_json::to_value(status).unwrap_or_default(),
        }
    }
}

/// Current lifecycle state of a container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Waiting {
        reason: Option<String>,
    },
    Terminated {
        exit_code: i32,
        reason: Option<String>,
    },
    Unknown,
}
