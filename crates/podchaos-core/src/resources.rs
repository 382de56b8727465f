use crate::ObjectKey;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Base validation for all resources
pub fn validate_base(metadata: &ObjectMeta) -> Result<(), ResourceError> {
    let name = metadata
        .name
        .as_ref()
        .ok_or_else(|| ResourceError::MissingField("metadata.name".to_string()))?;

    if !is_valid_name(name) {
        return Err(ResourceError::InvalidName(name.clone()));
    }

    if let Some(namespace) = &metadata.namespace {
        if !is_valid_name(namespace) {
            return Err(ResourceError::InvalidNamespace(namespace.clone()));
        }
    }

    Ok(())
}

/// Trait for Kubernetes resources handled by the controller
pub trait Resource: Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// Get the API version of this resource
    fn api_version(&self) -> String;

    /// Get the kind of this resource
    fn kind(&self) -> String;

    /// Get the metadata of this resource
    fn metadata(&self) -> &ObjectMeta;

    /// Get mutable metadata
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Get the namespace/name identity
    fn object_key(&self) -> Result<ObjectKey, ResourceError> {
        let metadata = self.metadata();
        let name = metadata
            .name
            .as_ref()
            .ok_or_else(|| ResourceError::MissingField("metadata.name".to_string()))?;
        let namespace = metadata
            .namespace
            .as_ref()
            .ok_or_else(|| ResourceError::MissingField("metadata.namespace".to_string()))?;

        Ok(ObjectKey::new(namespace.clone(), name.clone()))
    }

    /// Get the resource version used for optimistic concurrency
    fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }

    /// Validate the resource
    fn validate(&self) -> Result<(), ResourceError> {
        validate_base(self.metadata())
    }
}

/// Resource-related errors
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid resource name: {0}")]
    InvalidName(String),

    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Validate a Kubernetes resource name (DNS-1123 subdomain)
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }

    // Must contain only lowercase alphanumeric, '-', or '.'
    // Must start and end with alphanumeric
    let edge_ok = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let starts = name.chars().next().is_some_and(edge_ok);
    let ends = name.chars().last().is_some_and(edge_ok);

    starts
        && ends
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

impl Resource for Pod {
    fn api_version(&self) -> String {
        "v1".to_string()
    }

    fn kind(&self) -> String {
        "Pod".to_string()
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
