//! Compiled label selectors
//!
//! A `metav1.LabelSelector` is compiled once into a [`Selector`], which can
//! then be evaluated against label sets and rendered in the query-string
//! syntax accepted by the API server's `labelSelector` parameter.

use crate::error::{PodchaosError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;
use std::fmt;

/// A single compiled selector requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals { key: String, value: String },
    In { key: String, values: Vec<String> },
    NotIn { key: String, values: Vec<String> },
    Exists { key: String },
    DoesNotExist { key: String },
}

impl Requirement {
    fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        let get = |key: &str| labels.and_then(|l| l.get(key));
        match self {
            Self::Equals { key, value } => get(key) == Some(value),
            Self::In { key, values } => get(key).is_some_and(|v| values.contains(v)),
            Self::NotIn { key, values } => get(key).is_none_or(|v| !values.contains(v)),
            Self::Exists { key } => get(key).is_some(),
            Self::DoesNotExist { key } => get(key).is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { key, value } => write!(f, "{}={}", key, value),
            Self::In { key, values } => write!(f, "{} in ({})", key, values.join(",")),
            Self::NotIn { key, values } => write!(f, "{} notin ({})", key, values.join(",")),
            Self::Exists { key } => write!(f, "{}", key),
            Self::DoesNotExist { key } => write!(f, "!{}", key),
        }
    }
}

/// Conjunction of requirements; the empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Selector that matches every object
    pub fn everything() -> Self {
        Self::default()
    }

    /// Compile a `LabelSelector`, rejecting malformed requirements
    pub fn from_label_selector(selector: &LabelSelector) -> Result<Self> {
        let mut requirements = Vec::new();

        for (key, value) in selector.match_labels.iter().flatten() {
            validate_key(key)?;
            validate_value(key, value)?;
            requirements.push(Requirement::Equals {
                key: key.clone(),
                value: value.clone(),
            });
        }

        for expr in selector.match_expressions.iter().flatten() {
            validate_key(&expr.key)?;
            let key = expr.key.clone();
            let values = expr.values.clone().unwrap_or_default();
            for value in &values {
                validate_value(&key, value)?;
            }

            let requirement = match expr.operator.as_str() {
                "In" | "NotIn" if values.is_empty() => {
                    return Err(PodchaosError::invalid_selector(
                        format!(
                            "operator '{}' for key '{}' requires at least one value",
                            expr.operator, key
                        ),
                        "Add one or more entries to `values`",
                    ));
                }
                "In" => Requirement::In { key, values },
                "NotIn" => Requirement::NotIn { key, values },
                "Exists" | "DoesNotExist" if !values.is_empty() => {
                    return Err(PodchaosError::invalid_selector(
                        format!(
                            "operator '{}' for key '{}' must not have values",
                            expr.operator, key
                        ),
                        "Remove `values` from the requirement",
                    ));
                }
                "Exists" => Requirement::Exists { key },
                "DoesNotExist" => Requirement::DoesNotExist { key },
                other => {
                    return Err(PodchaosError::invalid_selector(
                        format!("unknown operator '{}' for key '{}'", other, key),
                        "Use one of In, NotIn, Exists or DoesNotExist",
                    ));
                }
            };
            requirements.push(requirement);
        }

        Ok(Self { requirements })
    }

    /// Check whether a label set satisfies every requirement
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", rendered.join(","))
    }
}

const MAX_LABEL_LENGTH: usize = 63;
const MAX_PREFIX_LENGTH: usize = 253;

/// Label keys are qualified names: an optional DNS subdomain prefix and '/',
/// then a name segment of at most 63 characters
fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason: String| {
        PodchaosError::invalid_selector(
            reason,
            "Label keys are an optional DNS subdomain prefix and '/', then up to 63 alphanumerics, '-', '_' or '.', starting and ending with an alphanumeric",
        )
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if !is_dns_subdomain(prefix) {
            return Err(invalid(format!(
                "label key '{}' has an invalid prefix '{}'",
                key, prefix
            )));
        }
    }
    if name.is_empty() {
        return Err(invalid(format!("label key '{}' has an empty name", key)));
    }
    if !is_label_segment(name) {
        return Err(invalid(format!("label key '{}' is not a valid qualified name", key)));
    }
    Ok(())
}

/// Label values are empty or a label segment
fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.is_empty() || is_label_segment(value) {
        return Ok(());
    }
    Err(PodchaosError::invalid_selector(
        format!("value '{}' for label key '{}' is not a valid label value", value, key),
        "Label values are up to 63 alphanumerics, '-', '_' or '.', starting and ending with an alphanumeric",
    ))
}

fn is_label_segment(s: &str) -> bool {
    let inner_ok = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    !s.is_empty()
        && s.len() <= MAX_LABEL_LENGTH
        && s.starts_with(|c: char| c.is_ascii_alphanumeric())
        && s.ends_with(|c: char| c.is_ascii_alphanumeric())
        && s.chars().all(inner_ok)
}

fn is_dns_subdomain(s: &str) -> bool {
    s.len() <= MAX_PREFIX_LENGTH
        && s.split('.').all(|part| {
            !part.is_empty()
                && part.len() <= MAX_LABEL_LENGTH
                && part.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
                && part.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}
