//! The poll loop: fetch state, run watchers, deliver notifications, sleep
//!
//! Everything runs on one thread. State is fetched before any watcher runs,
//! so a failed fetch abandons the cycle with every watcher untouched.

use crate::alerts::Notifier;
use crate::cluster::{ClusterProvider, ClusterState};
use crate::message::NotifyMessage;
use crate::monitoring::PollStats;
use crate::watchers::{WatchedResource, Watcher};
use anyhow::Context;
use log::{debug, error, info};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Pause between the end of one cycle and the start of the next
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Drives the configured watchers against one namespace
pub struct Poller {
    namespace: String,
    provider: Box<dyn ClusterProvider>,
    notifier: Box<dyn Notifier>,
    watchers: Vec<Box<dyn Watcher>>,
    interval: Duration,
    stats: PollStats,
}

impl Poller {
    /// Create a poller; watchers run in the order given
    pub fn new(
        namespace: impl Into<String>,
        provider: Box<dyn ClusterProvider>,
        notifier: Box<dyn Notifier>,
        watchers: Vec<Box<dyn Watcher>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            provider,
            notifier,
            watchers,
            interval: POLL_INTERVAL,
            stats: PollStats::new(),
        }
    }

    #[cfg(test)]
    fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub fn watcher_names(&self) -> Vec<&str> {
        self.watchers.iter().map(|w| w.name()).collect()
    }

    fn needs(&self, resource: WatchedResource) -> bool {
        self.watchers.iter().any(|w| w.resource() == resource)
    }

    /// Fetch only the resources some watcher actually reads
    fn fetch_state(&self) -> anyhow::Result<ClusterState> {
        let mut state = ClusterState::default();

        if self.needs(WatchedResource::Pods) {
            state.pods = self
                .provider
                .list_pods(&self.namespace)
                .with_context(|| format!("fetching pods in namespace {}", self.namespace))?;
        }

        if self.needs(WatchedResource::Events) {
            state.events = self
                .provider
                .list_events(&self.namespace)
                .with_context(|| format!("fetching events in namespace {}", self.namespace))?;
        }

        Ok(state)
    }

    /// Fetch state and run every watcher, returning the cycle's notifications
    ///
    /// # Errors
    ///
    /// Fails if the cluster state cannot be fetched. No watcher runs in that case.
    pub fn collect(&mut self) -> anyhow::Result<Vec<NotifyMessage>> {
        let state = self.fetch_state()?;
        debug!(
            "Fetched {} pods and {} events",
            state.pods.len(),
            state.events.len()
        );

        let mut messages = Vec::new();
        for watcher in &mut self.watchers {
            let produced = watcher.diff(&state);
            debug!("{} produced {} notifications", watcher.name(), produced.len());
            messages.extend(produced);
        }

        Ok(messages)
    }

    /// Send every message, one after another; failures do not stop the batch
    ///
    /// Returns the number of messages delivered.
    pub fn deliver(&mut self, messages: &[NotifyMessage]) -> usize {
        let mut delivered = 0;

        for message in messages {
            match self.notifier.send(message) {
                Ok(()) => {
                    delivered += 1;
                    self.stats.record_notification_result(true);
                }
                Err(e) => {
                    error!("Failed to deliver notification '{}': {}", message.summary, e);
                    self.stats.record_notification_result(false);
                }
            }
        }

        delivered
    }

    /// Run one complete cycle. Returns `false` if the cycle was abandoned.
    pub fn run_cycle(&mut self) -> bool {
        debug!("Starting poll cycle for namespace {}", self.namespace);

        let completed = match self.collect() {
            Ok(messages) => {
                if !messages.is_empty() {
                    let delivered = self.deliver(&messages);
                    info!("Delivered {}/{} notifications", delivered, messages.len());
                }
                self.stats.record_cycle_success();
                true
            }
            Err(e) => {
                error!("Poll cycle failed, skipping this cycle: {:?}", e);
                self.stats.record_cycle_failure();
                false
            }
        };

        self.stats.log_summary();
        completed
    }

    /// Poll until a shutdown signal arrives (or its sender is dropped)
    ///
    /// The signal is only checked between cycles; a running cycle always finishes.
    pub fn run(&mut self, shutdown: &Receiver<()>) {
        info!(
            "Watching namespace {} with {:?}, polling every {:?}",
            self.namespace,
            self.watcher_names(),
            self.interval
        );

        loop {
            self.run_cycle();

            match shutdown.recv_timeout(self.interval) {
                Ok(()) => {
                    info!("Shutdown signal received");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Shutdown channel closed");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Interval elapsed, poll again
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::MockNotifier;
    use crate::cluster::{
        ClusterEvent, ContainerSnapshot, ContainerState, MockClusterProvider, PodSnapshot,
    };
    use crate::error::{ClusterError, NotifyError};
    use crate::watchers::{EventWatcher, ExclusionFilter, PodWatcher, VaultActiveWatcher};
    use mockall::Sequence;
    use std::collections::BTreeMap;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    fn web_pod(ready: bool, restart_count: i32) -> PodSnapshot {
        PodSnapshot {
            uid: "7".to_string(),
            name: "web-0".to_string(),
            labels: BTreeMap::new(),
            containers: vec![ContainerSnapshot {
                name: "web".to_string(),
                ready,
                restart_count,
                state: if ready {
                    ContainerState::Running
                } else {
                    ContainerState::Waiting { reason: None }
                },
                details: serde_json::Value::Null,
            }],
        }
    }

    fn active_pod(name: &str) -> PodSnapshot {
        PodSnapshot {
            uid: format!("uid-{name}"),
            name: name.to_string(),
            labels: BTreeMap::from([("vault-active".to_string(), "true".to_string())]),
            containers: Vec::new(),
        }
    }

    fn warning_event(uid: &str) -> ClusterEvent {
        ClusterEvent {
            uid: uid.to_string(),
            event_type: "Warning".to_string(),
            message: "Readiness probe failed".to_string(),
            involved_name: "web-0".to_string(),
            field_path: String::new(),
        }
    }

    /// Notifier mock that records every message it is asked to send
    fn recording_notifier() -> (MockNotifier, Arc<Mutex<Vec<NotifyMessage>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = MockNotifier::new();
        let sink = Arc::clone(&sent);
        notifier.expect_send().returning(move |message| {
            sink.lock().unwrap().push(message.clone());
            Ok(())
        });
        (notifier, sent)
    }

    #[test]
    fn test_pod_restart_then_not_ready_scenario() {
        let mut provider = MockClusterProvider::new();
        let mut seq = Sequence::new();
        for pod in [web_pod(true, 0), web_pod(true, 1), web_pod(false, 1)] {
            provider
                .expect_list_pods()
                .withf(|namespace| namespace.to_string() == "apps")
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(vec![pod.clone()]));
        }
        provider.expect_list_events().never();

        let (notifier, sent) = recording_notifier();
        let watchers: Vec<Box<dyn Watcher>> = vec![Box::new(PodWatcher::new(
            "apps",
            ExclusionFilter::empty(),
        ))];
        let mut poller = Poller::new("apps", Box::new(provider), Box::new(notifier), watchers);

        assert!(poller.run_cycle());
        assert!(sent.lock().unwrap().is_empty());

        assert!(poller.run_cycle());
        {
            let sent = sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].body, "Old restart count=0, new restart count=1");
        }

        assert!(poller.run_cycle());
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].summary.contains("is not ready"));
        assert_eq!(poller.stats().cycles_completed, 3);
        assert_eq!(poller.stats().notifications_delivered, 2);
    }

    #[test]
    fn test_fetch_failure_abandons_cycle() {
        let mut provider = MockClusterProvider::new();
        provider
            .expect_list_pods()
            .returning(|_| Err(ClusterError::ClientSetup("connection refused".to_string())));

        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();

        let watchers: Vec<Box<dyn Watcher>> = vec![Box::new(VaultActiveWatcher::new("vault"))];
        let mut poller = Poller::new("vault", Box::new(provider), Box::new(notifier), watchers);

        assert!(!poller.run_cycle());
        assert_eq!(poller.stats().cycles_failed, 1);
        assert_eq!(poller.stats().cycles_completed, 0);
    }

    #[test]
    fn test_event_failure_drops_pod_notifications_too() {
        let mut provider = MockClusterProvider::new();
        // No active pod: the vault watcher would report an error if it ran
        provider.expect_list_pods().returning(|_| Ok(Vec::new()));
        provider
            .expect_list_events()
            .returning(|_| Err(ClusterError::ClientSetup("forbidden".to_string())));

        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();

        let watchers: Vec<Box<dyn Watcher>> = vec![
            Box::new(VaultActiveWatcher::new("vault")),
            Box::new(EventWatcher::new("vault", ExclusionFilter::empty())),
        ];
        let mut poller = Poller::new("vault", Box::new(provider), Box::new(notifier), watchers);

        assert!(poller.collect().is_err());
    }

    #[test]
    fn test_delivery_failure_does_not_stop_batch() {
        let mut provider = MockClusterProvider::new();
        provider.expect_list_pods().returning(|_| {
            Ok(vec![
                active_pod("vault-0"),
                active_pod("vault-1"),
            ])
        });

        let mut notifier = MockNotifier::new();
        let mut seq = Sequence::new();
        notifier
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(NotifyError::Rejected { status: 502 }));
        notifier
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        // Two vault watchers, both see two active pods: two messages per cycle
        let watchers: Vec<Box<dyn Watcher>> = vec![
            Box::new(VaultActiveWatcher::new("vault")),
            Box::new(VaultActiveWatcher::new("vault")),
        ];
        let mut poller = Poller::new("vault", Box::new(provider), Box::new(notifier), watchers);

        assert!(poller.run_cycle());
        assert_eq!(poller.stats().notifications_failed, 1);
        assert_eq!(poller.stats().notifications_delivered, 1);
    }

    #[test]
    fn test_messages_follow_watcher_order() {
        let mut provider = MockClusterProvider::new();
        let mut seq = Sequence::new();
        provider
            .expect_list_events()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));
        provider
            .expect_list_events()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![warning_event("e1")]));
        provider.expect_list_pods().returning(|_| Ok(Vec::new()));

        let (notifier, sent) = recording_notifier();
        let watchers: Vec<Box<dyn Watcher>> = vec![
            Box::new(EventWatcher::new("vault", ExclusionFilter::empty())),
            Box::new(VaultActiveWatcher::new("vault")),
        ];
        let mut poller = Poller::new("vault", Box::new(provider), Box::new(notifier), watchers);

        poller.run_cycle();
        poller.run_cycle();

        let sent = sent.lock().unwrap();
        let summaries: Vec<&str> = sent.iter().map(|m| m.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec![
                "🔴 Error: No vault pod is marked as active",
                "🟡 Warning: New event in namespace=vault",
                "🔴 Error: No vault pod is marked as active",
            ]
        );
    }

    #[test]
    fn test_run_stops_on_shutdown_signal() {
        let mut provider = MockClusterProvider::new();
        provider
            .expect_list_pods()
            .times(1)
            .returning(|_| Ok(vec![active_pod("vault-0")]));

        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();

        let watchers: Vec<Box<dyn Watcher>> = vec![Box::new(VaultActiveWatcher::new("vault"))];
        let mut poller = Poller::new("vault", Box::new(provider), Box::new(notifier), watchers)
            .with_interval(Duration::from_secs(30));

        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        poller.run(&rx);

        assert_eq!(poller.stats().cycles_completed, 1);
    }

    #[test]
    fn test_run_polls_until_channel_closes() {
        let mut provider = MockClusterProvider::new();
        provider
            .expect_list_pods()
            .returning(|_| Ok(vec![active_pod("vault-0")]));
        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();

        let watchers: Vec<Box<dyn Watcher>> = vec![Box::new(VaultActiveWatcher::new("vault"))];
        let mut poller = Poller::new("vault", Box::new(provider), Box::new(notifier), watchers)
            .with_interval(Duration::from_millis(10));

        let (tx, rx) = mpsc::channel::<()>();
        let closer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            drop(tx);
        });
        poller.run(&rx);
        closer.join().unwrap();

        assert!(poller.stats().cycles_completed >= 2);
    }
}
