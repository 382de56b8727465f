use crate::action::{Action, ReconcileError};
use crate::error::Result;
use crate::reconciler::MonkeyReconciler;
use crate::traits::ClusterClient;
use futures_util::future::join_all;
use podchaos_core::{ObjectKey, Resource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configuration for the Monkey controller loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Only watch Monkeys in this namespace (default: all namespaces)
    pub namespace: Option<String>,
    /// How often Monkeys are re-listed (default: 10s)
    pub resync_interval: Duration,
    /// Delay before retrying a failed reconcile that carries no requeue hint (default: 5s)
    pub error_backoff: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            resync_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl ControllerConfig {
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            namespace,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct Entry {
    /// `None` while the Monkey waits for a change
    due: Option<Instant>,
    /// resourceVersion seen at the last listing
    seen_version: Option<String>,
}

/// When each known Monkey is next due for reconciliation
#[derive(Debug, Default)]
pub struct Schedule {
    entries: HashMap<ObjectKey, Entry>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Due time of a Monkey; `None` when unknown or waiting for a change
    pub fn due_at(&self, key: &ObjectKey) -> Option<Instant> {
        self.entries.get(key).and_then(|e| e.due)
    }

    /// Earliest due time across all known Monkeys
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.values().filter_map(|e| e.due).min()
    }

    /// Track newly listed keys as due now, wake waiting keys whose
    /// resourceVersion moved, and forget keys no longer listed
    fn sync(&mut self, listed: HashMap<ObjectKey, Option<String>>, now: Instant) {
        self.entries.retain(|key, _| {
            let keep = listed.contains_key(key);
            if !keep {
                debug!(monkey = %key, "Forgetting deleted monkey");
            }
            keep
        });
        for (key, version) in listed {
            match self.entries.get_mut(&key) {
                Some(entry) => {
                    if entry.due.is_none() && entry.seen_version != version {
                        debug!(monkey = %key, "Monkey changed, reconciling");
                        entry.due = Some(now);
                    }
                    entry.seen_version = version;
                }
                None => {
                    self.entries.insert(
                        key,
                        Entry {
                            due: Some(now),
                            seen_version: version,
                        },
                    );
                }
            }
        }
    }

    fn take_due(&self, now: Instant) -> Vec<ObjectKey> {
        let mut due: Vec<ObjectKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.due.is_some_and(|at| at <= now))
            .map(|(key, _)| key.clone())
            .collect();
        due.sort();
        due
    }

    fn set(&mut self, key: &ObjectKey, due: Option<Instant>) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.due = due;
        }
    }
}

/// Drives reconciliation of every Monkey in the watched scope
///
/// Each cycle re-lists Monkeys, then reconciles the ones whose requeue time
/// has passed. Due Monkeys are reconciled concurrently and the cycle waits
/// for all of them, so a single Monkey never has two reconciles in flight.
/// A Monkey whose reconcile asked for no requeue is left alone until its
/// resourceVersion changes.
pub struct MonkeyController {
    client: Arc<dyn ClusterClient>,
    reconciler: MonkeyReconciler,
    config: ControllerConfig,
}

impl MonkeyController {
    pub fn new(client: Arc<dyn ClusterClient>, config: ControllerConfig) -> Self {
        let reconciler = MonkeyReconciler::new(client.clone());
        Self::with_reconciler(client, reconciler, config)
    }

    pub fn with_reconciler(
        client: Arc<dyn ClusterClient>,
        reconciler: MonkeyReconciler,
        config: ControllerConfig,
    ) -> Self {
        Self {
            client,
            reconciler,
            config,
        }
    }

    /// Run the controller loop until the token is cancelled.
    ///
    /// Cancellation also drops a cycle that is still waiting on the API server.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(
            namespace = self.config.namespace.as_deref().unwrap_or("<all>"),
            resync_interval = ?self.config.resync_interval,
            "Starting monkey controller"
        );

        let mut schedule = Schedule::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Monkey controller shutting down");
                    return Ok(());
                }
                _ = self.cycle(&mut schedule) => {}
            }

            let wake = self.next_wakeup(&schedule, Instant::now());
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Monkey controller shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    /// Next re-list, or sooner if a Monkey falls due before then
    fn next_wakeup(&self, schedule: &Schedule, now: Instant) -> Instant {
        let resync = now + self.config.resync_interval;
        schedule
            .next_due()
            .map(|due| due.max(now).min(resync))
            .unwrap_or(resync)
    }

    /// One pass: re-list Monkeys, then reconcile every due one.
    ///
    /// Returns the number of Monkeys reconciled.
    pub async fn cycle(&self, schedule: &mut Schedule) -> usize {
        let now = Instant::now();
        match self.client.list_monkeys(self.config.namespace.as_deref()).await {
            Ok(monkeys) => {
                let listed: HashMap<ObjectKey, Option<String>> = monkeys
                    .iter()
                    .filter_map(|m| {
                        let version = m.resource_version().map(str::to_string);
                        m.object_key().ok().map(|key| (key, version))
                    })
                    .collect();
                schedule.sync(listed, now);
            }
            Err(e) => {
                warn!(error = %e, "Failed to list monkeys, reconciling known ones");
            }
        }

        let due = schedule.take_due(now);
        if due.is_empty() {
            return 0;
        }

        let reconciler = &self.reconciler;
        let results = join_all(due.into_iter().map(|key| async move {
            let result = reconciler.reconcile(&key).await;
            (key, result)
        }))
        .await;

        let count = results.len();
        let finished = Instant::now();
        for (key, result) in results {
            let due = self.requeue_delay(&key, &result).map(|d| finished + d);
            schedule.set(&key, due);
        }
        count
    }

    /// Delay before the next reconcile, or `None` to wait for a change
    fn requeue_delay(
        &self,
        key: &ObjectKey,
        result: &std::result::Result<Action, ReconcileError>,
    ) -> Option<Duration> {
        match result {
            Ok(action) => {
                let delay = action.requeue_after();
                if delay.is_none() {
                    debug!(monkey = %key, "Waiting for monkey to change");
                }
                delay
            }
            Err(e) => {
                let delay = e.requeue_after().unwrap_or(self.config.error_backoff);
                error!(monkey = %key, error = %e, retry_in = ?delay, "Reconcile failed");
                Some(delay)
            }
        }
    }
}
