use serde::{Deserialize, Serialize};
use std::fmt;

/// GroupVersionKind uniquely identifies a Kubernetes resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group (e.g., "", "podchaos.podchaosmonkey.pt")
    pub group: String,
    /// API version (e.g., "v1", "v1alpha1")
    pub version: String,
    /// Resource kind (e.g., "Pod", "Monkey")
    pub kind: String,
}

impl GroupVersionKind {
    /// Create a new GVK
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Get the apiVersion string (group/version or just version)
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Get the API path prefix ("api/v1" or "apis/{group}/{version}")
    pub fn api_path(&self) -> String {
        if self.group.is_empty() {
            format!("api/{}", self.version)
        } else {
            format!("apis/{}/{}", self.group, self.version)
        }
    }

    /// Get the resource name (lowercase, plural)
    pub fn resource_name(&self) -> String {
        let lower = self.kind.to_lowercase();
        if lower.ends_with('s') {
            format!("{}es", lower)
        } else if let Some(stem) = lower.strip_suffix('y') {
            // "policy" -> "policies", but "monkey" -> "monkeys"
            match stem.chars().last() {
                Some('a' | 'e' | 'i' | 'o' | 'u') => format!("{}s", lower),
                _ => format!("{}ies", stem),
            }
        } else {
            format!("{}s", lower)
        }
    }

    /// Path of the collection, optionally scoped to a namespace
    pub fn collection_path(&self, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!(
                "/{}/namespaces/{}/{}",
                self.api_path(),
                ns,
                self.resource_name()
            ),
            None => format!("/{}/{}", self.api_path(), self.resource_name()),
        }
    }

    /// Path of a single namespaced object
    pub fn object_path(&self, key: &ObjectKey) -> String {
        format!(
            "{}/{}",
            self.collection_path(Some(&key.namespace)),
            key.name
        )
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// Namespace + name identity of an object, the unit of reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvk_api_version() {
        let gvk = GroupVersionKind::new("", "v1", "Pod");
        assert_eq!(gvk.api_version(), "v1");
        assert_eq!(gvk.api_path(), "api/v1");

        let gvk = GroupVersionKind::new("podchaos.podchaosmonkey.pt", "v1alpha1", "Monkey");
        assert_eq!(gvk.api_version(), "podchaos.podchaosmonkey.pt/v1alpha1");
        assert_eq!(gvk.api_path(), "apis/podchaos.podchaosmonkey.pt/v1alpha1");
    }

    #[test]
    fn test_gvk_resource_name() {
        assert_eq!(GroupVersionKind::new("", "v1", "Pod").resource_name(), "pods");
        assert_eq!(
            GroupVersionKind::new("podchaos.podchaosmonkey.pt", "v1alpha1", "Monkey").resource_name(),
            "monkeys"
        );
        assert_eq!(
            GroupVersionKind::new("networking.k8s.io", "v1", "NetworkPolicy").resource_name(),
            "networkpolicies"
        );
        assert_eq!(
            GroupVersionKind::new("", "v1", "Ingress").resource_name(),
            "ingresses"
        );
    }

    #[test]
    fn test_paths() {
        let pods = GroupVersionKind::new("", "v1", "Pod");
        assert_eq!(pods.collection_path(None), "/api/v1/pods");
        assert_eq!(
            pods.collection_path(Some("workloads")),
            "/api/v1/namespaces/workloads/pods"
        );

        let monkeys = GroupVersionKind::new("podchaos.podchaosmonkey.pt", "v1alpha1", "Monkey");
        assert_eq!(
            monkeys.object_path(&ObjectKey::new("workloads", "test")),
            "/apis/podchaos.podchaosmonkey.pt/v1alpha1/namespaces/workloads/monkeys/test"
        );
    }

    #[test]
    fn test_object_key_display() {
        assert_eq!(ObjectKey::new("workloads", "test").to_string(), "workloads/test");
    }
}
