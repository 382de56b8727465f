use crate::error::{ControllerError, Result};
use crate::traits::ClusterClient;
use async_trait::async_trait;
use podchaos_core::{Monkey, ObjectKey, Pod, Resource, Selector};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// One-shot failure injected into the next matching `MockCluster` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `get_monkey` fails with an API error
    GetMonkey,
    /// `list_pods` fails with an API error
    ListPods,
    /// `delete_pod` fails with a 403
    DeletePod,
    /// `delete_pod` removes the pod but reports not-found, as if another actor won the race
    DeletePodRaced,
    /// `update_monkey_status` fails with a conflict
    StatusConflict,
    /// `update_monkey_status` fails with an API error
    UpdateStatus,
}

/// In-memory cluster for testing without an API server
///
/// Objects are keyed by namespace/name and listed in key order. Every write
/// bumps a cluster-wide resourceVersion, and status writes carrying a stale
/// resourceVersion are rejected with a conflict, like the real API server.
#[derive(Clone, Default)]
pub struct MockCluster {
    monkeys: Arc<RwLock<BTreeMap<ObjectKey, Monkey>>>,
    pods: Arc<RwLock<BTreeMap<ObjectKey, Pod>>>,
    faults: Arc<RwLock<Vec<Fault>>>,
    next_version: Arc<AtomicU64>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self) -> String {
        (self.next_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Arm a fault for the next matching call
    pub async fn inject_fault(&self, fault: Fault) {
        self.faults.write().await.push(fault);
    }

    async fn take_fault(&self, fault: Fault) -> bool {
        let mut faults = self.faults.write().await;
        match faults.iter().position(|f| *f == fault) {
            Some(idx) => {
                faults.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Create or replace a Monkey, assigning uid, generation and resourceVersion
    pub async fn add_monkey(&self, mut monkey: Monkey) -> Result<Monkey> {
        let key = monkey
            .object_key()
            .map_err(|e| ControllerError::internal_error(e.to_string()))?;
        let meta = monkey.metadata_mut();
        meta.uid.get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
        meta.generation.get_or_insert(1);
        meta.resource_version = Some(self.bump_version());

        self.monkeys.write().await.insert(key, monkey.clone());
        Ok(monkey)
    }

    pub async fn remove_monkey(&self, key: &ObjectKey) -> Option<Monkey> {
        self.monkeys.write().await.remove(key)
    }

    pub async fn monkey(&self, key: &ObjectKey) -> Option<Monkey> {
        self.monkeys.read().await.get(key).cloned()
    }

    /// Create a pod, assigning a uid when it has none
    pub async fn add_pod(&self, mut pod: Pod) -> Result<Pod> {
        let key = pod
            .object_key()
            .map_err(|e| ControllerError::internal_error(e.to_string()))?;
        pod.metadata
            .uid
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
        pod.metadata.resource_version = Some(self.bump_version());

        self.pods.write().await.insert(key, pod.clone());
        Ok(pod)
    }

    /// All pods currently in the cluster, in key order
    pub async fn pods(&self) -> Vec<Pod> {
        self.pods.read().await.values().cloned().collect()
    }

    pub async fn pod_names(&self) -> Vec<String> {
        self.pods
            .read()
            .await
            .keys()
            .map(|k| k.name.clone())
            .collect()
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn get_monkey(&self, key: &ObjectKey) -> Result<Monkey> {
        if self.take_fault(Fault::GetMonkey).await {
            return Err(ControllerError::api_error(Some(500), "injected get failure"));
        }
        self.monkeys
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| ControllerError::not_found(format!("monkey {}", key)))
    }

    async fn list_monkeys(&self, namespace: Option<&str>) -> Result<Vec<Monkey>> {
        let monkeys = self.monkeys.read().await;
        Ok(monkeys
            .iter()
            .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn update_monkey_status(&self, monkey: &Monkey) -> Result<Monkey> {
        let key = monkey
            .object_key()
            .map_err(|e| ControllerError::internal_error(e.to_string()))?;
        let resource_key = format!("monkey {}", key);

        if self.take_fault(Fault::StatusConflict).await {
            return Err(ControllerError::conflict(resource_key, "injected conflict"));
        }
        if self.take_fault(Fault::UpdateStatus).await {
            return Err(ControllerError::api_error(Some(500), "injected update failure"));
        }

        let mut monkeys = self.monkeys.write().await;
        let stored = monkeys
            .get_mut(&key)
            .ok_or_else(|| ControllerError::not_found(resource_key.clone()))?;

        if let Some(version) = monkey.resource_version() {
            if stored.resource_version() != Some(version) {
                return Err(ControllerError::conflict(
                    resource_key,
                    format!(
                        "resourceVersion {} is stale (current {})",
                        version,
                        stored.resource_version().unwrap_or("<none>")
                    ),
                ));
            }
        }

        stored.status = monkey.status.clone();
        stored.metadata.resource_version = Some(self.bump_version());
        debug!("Mock: status updated for monkey {}", key);
        Ok(stored.clone())
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>> {
        if self.take_fault(Fault::ListPods).await {
            return Err(ControllerError::api_error(Some(500), "injected list failure"));
        }
        let pods = self.pods.read().await;
        Ok(pods
            .iter()
            .filter(|(key, pod)| {
                key.namespace == namespace && selector.matches(pod.metadata.labels.as_ref())
            })
            .map(|(_, pod)| pod.clone())
            .collect())
    }

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: i64,
    ) -> Result<()> {
        let key = ObjectKey::new(namespace, name);
        if self.take_fault(Fault::DeletePod).await {
            return Err(ControllerError::api_error(
                Some(403),
                format!("pods \"{}\" is forbidden", name),
            ));
        }

        let removed = self.pods.write().await.remove(&key);
        if self.take_fault(Fault::DeletePodRaced).await {
            return Err(ControllerError::not_found(format!("pod {}", key)));
        }

        match removed {
            Some(_) => {
                debug!(
                    "Mock: pod {} deleted (grace period {}s)",
                    key, grace_period_seconds
                );
                Ok(())
            }
            None => Err(ControllerError::not_found(format!("pod {}", key))),
        }
    }
}

/// Build a labelled pod for tests
#[cfg(test)]
pub(crate) fn test_pod(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Pod {
    let mut pod = Pod::default();
    pod.metadata.name = Some(name.to_string());
    pod.metadata.namespace = Some(namespace.to_string());
    pod.metadata.labels = Some(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    pod
}

#[cfg(test)]
mod tests {
    use super::*;
    use podchaos_core::{LabelSelector, MonkeySpec};

    fn allow_chaos() -> Selector {
        Selector::from_label_selector(&LabelSelector {
            match_labels: Some(BTreeMap::from([(
                "allowChaos".to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_add_pod_assigns_uid() {
        let cluster = MockCluster::new();
        let pod = cluster
            .add_pod(test_pod("workloads", "web-1", &[]))
            .await
            .unwrap();
        assert!(pod.metadata.uid.is_some());
    }

    #[tokio::test]
    async fn test_list_pods_filters_namespace_and_labels() {
        let cluster = MockCluster::new();
        for (ns, name, allow) in [
            ("workloads", "a", "false"),
            ("workloads", "b", "true"),
            ("other", "c", "true"),
        ] {
            cluster
                .add_pod(test_pod(ns, name, &[("allowChaos", allow)]))
                .await
                .unwrap();
        }

        let pods = cluster.list_pods("workloads", &allow_chaos()).await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name.as_deref(), Some("b"));

        let all = cluster
            .list_pods("workloads", &Selector::everything())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_pod_is_not_found() {
        let cluster = MockCluster::new();
        let err = cluster.delete_pod("workloads", "ghost", 0).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stale_status_write_conflicts() {
        let cluster = MockCluster::new();
        let stored = cluster
            .add_monkey(Monkey::new("workloads", "test", MonkeySpec::default()))
            .await
            .unwrap();

        let mut first = stored.clone();
        let condition = first.registered_condition();
        first.status.conditions.push(condition.clone());
        cluster.update_monkey_status(&first).await.unwrap();

        // Second writer still holds the old resourceVersion
        let mut second = stored;
        second.status.conditions.push(condition);
        let err = cluster.update_monkey_status(&second).await.unwrap_err();
        assert!(err.is_conflict());

        let key = ObjectKey::new("workloads", "test");
        assert_eq!(cluster.monkey(&key).await.unwrap().status.conditions.len(), 1);
    }

    #[tokio::test]
    async fn test_faults_fire_once() {
        let cluster = MockCluster::new();
        cluster.inject_fault(Fault::ListPods).await;

        assert!(cluster
            .list_pods("workloads", &Selector::everything())
            .await
            .is_err());
        assert!(cluster
            .list_pods("workloads", &Selector::everything())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_list_monkeys_by_namespace() {
        let cluster = MockCluster::new();
        cluster
            .add_monkey(Monkey::new("a", "m1", MonkeySpec::default()))
            .await
            .unwrap();
        cluster
            .add_monkey(Monkey::new("b", "m2", MonkeySpec::default()))
            .await
            .unwrap();

        assert_eq!(cluster.list_monkeys(None).await.unwrap().len(), 2);
        assert_eq!(cluster.list_monkeys(Some("a")).await.unwrap().len(), 1);
    }
}
