use crate::cluster::{ClusterEvent, ClusterState};
use crate::message::{NotifyMessage, Severity};
use crate::watchers::{ExclusionFilter, WatchedResource, Watcher};
use log::{debug, info};
use std::collections::HashSet;

/// Reports every new non-`Normal` event in a namespace exactly once
///
/// Events are keyed by UID and only their first sighting counts: an event whose
/// repeat counter keeps growing is not reported again. The first poll only
/// records what already exists, so startup does not flood the webhook.
pub struct EventWatcher {
    namespace: String,
    exclude: ExclusionFilter,
    seen_events: HashSet<String>,
    first_run: bool,
}

impl EventWatcher {
    pub fn new(namespace: impl Into<String>, exclude: ExclusionFilter) -> Self {
        Self {
            namespace: namespace.into(),
            exclude,
            seen_events: HashSet::new(),
            first_run: true,
        }
    }

    pub fn has_seen(&self, uid: &str) -> bool {
        self.seen_events.contains(uid)
    }

    /// Process one poll's worth of events
    pub fn diff_events(&mut self, events: &[ClusterEvent]) -> Vec<NotifyMessage> {
        let mut messages = Vec::new();

        for event in events.iter().filter(|event| !event.is_normal()) {
            if self.exclude.should_exclude(&event.involved_name) {
                info!(
                    "Not notifying for {} because it matched an exclude pattern",
                    event.involved_name
                );
                continue;
            }

            if !self.seen_events.insert(event.uid.clone()) {
                continue;
            }

            debug!("New event {}: {:?}", event.uid, event);
            messages.push(self.format_event(event));
        }

        if self.first_run {
            self.first_run = false;
            if !messages.is_empty() {
                info!(
                    "Suppressing {} pre-existing events in namespace={} on first run",
                    messages.len(),
                    self.namespace
                );
            }
            return Vec::new();
        }

        messages
    }

    fn format_event(&self, event: &ClusterEvent) -> NotifyMessage {
        let marker = Severity::from_event_type(&event.event_type)
            .map(Severity::marker)
            .unwrap_or("");

        NotifyMessage::new(
            format!(
                "{}{}: New event in namespace={}",
                marker, event.event_type, self.namespace
            ),
            format!(
                "pod: {}\nfield_path: {}\nmessage: {}",
                event.involved_name, event.field_path, event.message
            ),
        )
    }
}

impl Watcher for EventWatcher {
    fn name(&self) -> &str {
        "EventWatcher"
    }

    fn resource(&self) -> WatchedResource {
        WatchedResource::Events
    }

    fn diff(&mut self, state: &ClusterState) -> Vec<NotifyMessage> {
        self.diff_events(&state.events)
    }
}
