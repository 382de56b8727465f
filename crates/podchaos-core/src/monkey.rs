//! The `Monkey` custom resource (`podchaos.podchaosmonkey.pt/v1alpha1`)

use crate::resources::{validate_base, Resource, ResourceError};
use crate::selector::Selector;
use crate::GroupVersionKind;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    Condition, LabelSelector, ListMeta, ObjectMeta, Time,
};
use serde::{Deserialize, Serialize};

pub const MONKEY_GROUP: &str = "podchaos.podchaosmonkey.pt";
pub const MONKEY_VERSION: &str = "v1alpha1";
pub const MONKEY_KIND: &str = "Monkey";

/// Condition type appended the first time a Monkey is reconciled
pub const REGISTERED_CONDITION: &str = "Registered";

/// Namespace searched when neither the spec nor the object names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Desired state of a Monkey
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonkeySpec {
    /// Log the pod that would be killed instead of killing it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub noop: bool,

    /// Time between experiments, e.g. "30s" or "5m"; empty means the default
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,

    /// Namespace to search for pods
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Pods must match this selector to be eligible
    #[serde(default)]
    pub selector: LabelSelector,
}

/// Observed state of a Monkey
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonkeyStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Schema for the monkeys API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monkey {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: MonkeySpec,
    #[serde(default)]
    pub status: MonkeyStatus,
}

/// List wrapper returned by the collection endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonkeyList {
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<Monkey>,
}

fn default_api_version() -> String {
    format!("{}/{}", MONKEY_GROUP, MONKEY_VERSION)
}

fn default_kind() -> String {
    MONKEY_KIND.to_string()
}

impl Default for Monkey {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::default(),
            spec: MonkeySpec::default(),
            status: MonkeyStatus::default(),
        }
    }
}

impl Monkey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: MonkeySpec) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                ..Default::default()
            },
            spec,
            ..Default::default()
        }
    }

    /// GroupVersionKind of every Monkey
    pub fn static_gvk() -> GroupVersionKind {
        GroupVersionKind::new(MONKEY_GROUP, MONKEY_VERSION, MONKEY_KIND)
    }

    /// Namespace searched for candidate pods.
    ///
    /// Falls back to the Monkey's own namespace when the spec leaves it empty.
    pub fn target_namespace(&self) -> &str {
        if !self.spec.namespace.is_empty() {
            return &self.spec.namespace;
        }
        self.metadata
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Compile the spec's label selector
    pub fn selector(&self) -> crate::Result<Selector> {
        Selector::from_label_selector(&self.spec.selector)
    }

    /// A Monkey is registered once it carries any condition
    pub fn is_registered(&self) -> bool {
        !self.status.conditions.is_empty()
    }

    /// The condition recorded on first registration
    pub fn registered_condition(&self) -> Condition {
        Condition {
            type_: REGISTERED_CONDITION.to_string(),
            status: "True".to_string(),
            observed_generation: Some(self.metadata.generation.unwrap_or(0)),
            last_transition_time: Time(Utc::now()),
            reason: REGISTERED_CONDITION.to_string(),
            message: String::new(),
        }
    }
}

impl Resource for Monkey {
    fn api_version(&self) -> String {
        self.api_version.clone()
    }

    fn kind(&self) -> String {
        self.kind.clone()
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn validate(&self) -> Result<(), ResourceError> {
        validate_base(&self.metadata)?;

        if self.kind != MONKEY_KIND {
            return Err(ResourceError::ValidationFailed(format!(
                "expected kind {}, got {}",
                MONKEY_KIND, self.kind
            )));
        }

        self.selector()
            .map_err(|e| ResourceError::ValidationFailed(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_yaml;
    use std::collections::BTreeMap;

    const MANIFEST: &str = r#"
apiVersion: podchaos.podchaosmonkey.pt/v1alpha1
kind: Monkey
metadata:
  name: test
  namespace: workloads
spec:
  interval: 5m
  namespace: workloads
  selector:
    matchLabels:
      allowChaos: "true"
"#;

    #[test]
    fn test_manifest_round_trips_through_serde() {
        let monkey: Monkey = from_yaml(MANIFEST).unwrap();
        assert_eq!(monkey.metadata.name.as_deref(), Some("test"));
        assert_eq!(monkey.spec.interval, "5m");
        assert!(!monkey.spec.noop);
        assert_eq!(
            monkey.spec.selector.match_labels,
            Some(BTreeMap::from([("allowChaos".to_string(), "true".to_string())]))
        );
        assert!(!monkey.is_registered());

        let json = serde_json::to_string(&monkey).unwrap();
        assert!(json.contains("\"apiVersion\":\"podchaos.podchaosmonkey.pt/v1alpha1\""));
        assert!(!json.contains("\"noop\""));
        assert!(!json.contains("\"conditions\""));
    }

    #[test]
    fn test_defaults_when_fields_omitted() {
        let monkey: Monkey = from_yaml("metadata:\n  name: bare\n").unwrap();
        assert_eq!(monkey.kind, MONKEY_KIND);
        assert_eq!(monkey.api_version, "podchaos.podchaosmonkey.pt/v1alpha1");
        assert_eq!(monkey.spec, MonkeySpec::default());
    }

    #[test]
    fn test_target_namespace_fallback() {
        let mut monkey = Monkey::new("chaos", "m", MonkeySpec::default());
        assert_eq!(monkey.target_namespace(), "chaos");

        monkey.spec.namespace = "workloads".to_string();
        assert_eq!(monkey.target_namespace(), "workloads");

        monkey.spec.namespace.clear();
        monkey.metadata.namespace = None;
        assert_eq!(monkey.target_namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_registered_condition_fields() {
        let mut monkey = Monkey::new("workloads", "test", MonkeySpec::default());
        monkey.metadata.generation = Some(3);

        let condition = monkey.registered_condition();
        assert_eq!(condition.type_, "Registered");
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason, "Registered");
        assert_eq!(condition.message, "");
        assert_eq!(condition.observed_generation, Some(3));

        monkey.status.conditions.push(condition);
        assert!(monkey.is_registered());
        assert_eq!(monkey.status.conditions[0].type_, REGISTERED_CONDITION);
    }

    #[test]
    fn test_validate_checks_selector() {
        let mut monkey: Monkey = from_yaml(MANIFEST).unwrap();
        assert!(monkey.validate().is_ok());

        monkey.spec.selector.match_labels = Some(BTreeMap::from([(String::new(), "x".to_string())]));
        assert!(matches!(
            monkey.validate(),
            Err(ResourceError::ValidationFailed(_))
        ));
    }
}
