// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for podchaos resource handling
#[derive(Error, Debug, Diagnostic)]
pub enum PodchaosError {
    /// Label selector could not be compiled
    #[error("Invalid label selector: {reason}")]
    #[diagnostic(
        code(podchaos::invalid_selector),
        help("{suggestion}")
    )]
    InvalidSelector {
        #[allow(unused)]
        reason: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(podchaos::serialization_error),
        help("Ensure the resource format is valid JSON or YAML")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, PodchaosError>;

impl PodchaosError {
    /// Create an InvalidSelector error
    pub fn invalid_selector(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidSelector {
            reason: reason.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_display() {
        let err = PodchaosError::invalid_selector(
            "unknown operator 'Contains' for key 'app'",
            "Use In, NotIn, Exists or DoesNotExist",
        );
        assert_eq!(
            err.to_string(),
            "Invalid label selector: unknown operator 'Contains' for key 'app'"
        );
    }

    #[test]
    fn test_serialization_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PodchaosError::serialization_error("bad json", Some(Box::new(source)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
