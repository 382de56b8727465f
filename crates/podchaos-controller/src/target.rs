use crate::error::{ControllerError, Result};
use crate::traits::ClusterClient;
use k8s_openapi::api::core::v1::Pod;
use podchaos_core::{LabelSelector, Selector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Source of the index used to pick one candidate out of `len`
///
/// Implementations must return a value in `0..len`; `len` is never zero.
pub trait RandomIndex: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

impl<F> RandomIndex for F
where
    F: Fn(usize) -> usize + Send + Sync,
{
    fn pick(&self, len: usize) -> usize {
        self(len)
    }
}

/// Uniform pick from a generator seeded with the current time on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeededRandom;

impl RandomIndex for TimeSeededRandom {
    fn pick(&self, len: usize) -> usize {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        StdRng::seed_from_u64(seed).gen_range(0..len)
    }
}

/// A pod eligible for termination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub namespace: String,
    pub name: String,
    pub uid: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl Candidate {
    /// Build a candidate from a listed pod; pods without a name are skipped
    fn from_pod(pod: Pod, namespace: &str) -> Option<Self> {
        let meta = pod.metadata;
        Some(Self {
            name: meta.name?,
            namespace: meta.namespace.unwrap_or_else(|| namespace.to_string()),
            uid: meta.uid,
            labels: meta.labels.unwrap_or_default(),
        })
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Picks one pod at random among those matching a Monkey's selector
pub struct TargetSelector {
    client: Arc<dyn ClusterClient>,
    random: Arc<dyn RandomIndex>,
}

impl TargetSelector {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self::with_random(client, Arc::new(TimeSeededRandom))
    }

    pub fn with_random(client: Arc<dyn ClusterClient>, random: Arc<dyn RandomIndex>) -> Self {
        Self { client, random }
    }

    /// Choose a target in `namespace`, or `None` when nothing matches
    pub async fn select(
        &self,
        namespace: &str,
        label_selector: &LabelSelector,
    ) -> Result<Option<Candidate>> {
        let selector = Selector::from_label_selector(label_selector)
            .map_err(|e| ControllerError::selection_error(namespace, e.to_string()))?;

        let pods = self
            .client
            .list_pods(namespace, &selector)
            .await
            .map_err(|e| ControllerError::selection_error(namespace, e.to_string()))?;

        // Re-checked locally: a non-matching pod must never be chosen
        let candidates: Vec<Candidate> = pods
            .into_iter()
            .filter(|pod| selector.matches(pod.metadata.labels.as_ref()))
            .filter_map(|pod| Candidate::from_pod(pod, namespace))
            .collect();

        if candidates.is_empty() {
            debug!(
                namespace = %namespace,
                selector = %selector,
                "No pods match selector"
            );
            return Ok(None);
        }

        let len = candidates.len();
        let idx = self.random.pick(len);
        let target = candidates.into_iter().nth(idx).ok_or_else(|| {
            ControllerError::internal_error(format!(
                "random index {} out of range for {} candidates",
                idx, len
            ))
        })?;

        debug!(
            namespace = %namespace,
            candidates = len,
            target = %target,
            "Selected chaos target"
        );
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{test_pod, Fault, MockCluster};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
    use std::collections::HashMap;

    fn allow_chaos() -> LabelSelector {
        LabelSelector {
            match_labels: Some(BTreeMap::from([(
                "allowChaos".to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        }
    }

    async fn cluster_with_pods() -> MockCluster {
        let cluster = MockCluster::new();
        for (name, allow) in [("dont-delete", "false"), ("delete", "true"), ("delete-2", "true")] {
            cluster
                .add_pod(test_pod("workloads", name, &[("allowChaos", allow)]))
                .await
                .unwrap();
        }
        cluster
    }

    #[tokio::test]
    async fn test_fixed_index_picks_first_listed() {
        let cluster = cluster_with_pods().await;
        let selector = TargetSelector::with_random(Arc::new(cluster), Arc::new(|_: usize| 0usize));

        let target = selector
            .select("workloads", &allow_chaos())
            .await
            .unwrap()
            .unwrap();

        // Listing is in name order: "delete" < "delete-2"
        assert_eq!(target.name, "delete");
        assert_eq!(target.namespace, "workloads");
        assert!(target.uid.is_some());
        assert_eq!(target.labels.get("allowChaos").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_non_matching_pods_are_never_selected() {
        let cluster = cluster_with_pods().await;
        let selector = TargetSelector::new(Arc::new(cluster));

        for _ in 0..50 {
            let target = selector
                .select("workloads", &allow_chaos())
                .await
                .unwrap()
                .unwrap();
            assert_ne!(target.name, "dont-delete");
        }
    }

    #[tokio::test]
    async fn test_no_match_is_none_not_error() {
        let cluster = cluster_with_pods().await;
        let selector = TargetSelector::new(Arc::new(cluster));

        let result = selector.select("empty-namespace", &allow_chaos()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_empty_selector_matches_whole_namespace() {
        let cluster = cluster_with_pods().await;
        let selector = TargetSelector::with_random(Arc::new(cluster), Arc::new(|len: usize| len - 1));

        let target = selector
            .select("workloads", &LabelSelector::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(target.name, "dont-delete");
    }

    #[tokio::test]
    async fn test_selection_is_roughly_uniform() {
        let cluster = MockCluster::new();
        for name in ["a", "b", "c"] {
            cluster
                .add_pod(test_pod("workloads", name, &[("allowChaos", "true")]))
                .await
                .unwrap();
        }
        let selector = TargetSelector::new(Arc::new(cluster));

        let trials = 3000;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..trials {
            let target = selector
                .select("workloads", &allow_chaos())
                .await
                .unwrap()
                .unwrap();
            *counts.entry(target.name).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (name, count) in counts {
            // Expected 1000 each; allow a wide band to keep the test stable
            assert!(
                (600..=1400).contains(&count),
                "{} chosen {} times out of {}",
                name,
                count,
                trials
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_selector_is_selection_error() {
        let cluster = cluster_with_pods().await;
        let selector = TargetSelector::new(Arc::new(cluster));

        let bad = LabelSelector {
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "app".to_string(),
                operator: "Matches".to_string(),
                values: None,
            }]),
            ..Default::default()
        };
        let err = selector.select("workloads", &bad).await.unwrap_err();
        assert!(matches!(err, ControllerError::SelectionError { .. }));
    }

    #[tokio::test]
    async fn test_list_failure_is_selection_error() {
        let cluster = cluster_with_pods().await;
        cluster.inject_fault(Fault::ListPods).await;
        let selector = TargetSelector::new(Arc::new(cluster));

        let err = selector
            .select("workloads", &allow_chaos())
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::SelectionError { .. }));
        assert!(err.to_string().contains("injected list failure"));
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_reported() {
        let cluster = cluster_with_pods().await;
        let selector = TargetSelector::with_random(Arc::new(cluster), Arc::new(|len: usize| len));

        let err = selector
            .select("workloads", &allow_chaos())
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InternalError { .. }));
    }
}
