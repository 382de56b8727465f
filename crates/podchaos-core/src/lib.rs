//! Podchaos Core - resource types shared by the chaos controller
//!
//! This crate provides:
//! - The `Monkey` custom resource and its status conditions
//! - Label selector compilation and matching
//! - Error types with miette diagnostics
//! - Manifest parsing

pub mod error;
pub mod monkey;
pub mod resources;
pub mod selector;
pub mod types;

// Re-export commonly used types
pub use error::{PodchaosError, Result};
pub use monkey::{
    Monkey, MonkeyList, MonkeySpec, MonkeyStatus, DEFAULT_NAMESPACE, REGISTERED_CONDITION,
};
pub use resources::{is_valid_name, Resource, ResourceError};
pub use selector::{Requirement, Selector};
pub use types::{GroupVersionKind, ObjectKey};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::Pod;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, LabelSelector, ObjectMeta};

/// Deserialize a resource from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        PodchaosError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}
