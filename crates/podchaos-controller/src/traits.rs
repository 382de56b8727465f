use crate::error::Result;
use async_trait::async_trait;
use podchaos_core::{Monkey, ObjectKey, Pod, Selector};

/// Trait for the cluster resource store the controller talks to
///
/// This trait abstracts over the Kubernetes API server. It enables testing
/// via `MockCluster` without a running cluster. Implementations report a
/// missing object as `ControllerError::NotFound` and a stale status write as
/// `ControllerError::Conflict`.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    // --- Monkeys ---

    /// Fetch a single Monkey
    async fn get_monkey(&self, key: &ObjectKey) -> Result<Monkey>;

    /// List Monkeys in one namespace, or across all namespaces
    async fn list_monkeys(&self, namespace: Option<&str>) -> Result<Vec<Monkey>>;

    /// Write the status subresource of a Monkey
    async fn update_monkey_status(&self, monkey: &Monkey) -> Result<Monkey>;

    // --- Pods ---

    /// List pods in a namespace whose labels satisfy `selector`
    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>>;

    /// Delete a pod with the given grace period
    async fn delete_pod(&self, namespace: &str, name: &str, grace_period_seconds: i64)
        -> Result<()>;
}
