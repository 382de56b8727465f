use miette::Diagnostic;
use thiserror::Error;

/// Controller error type for reconciliation and cluster access
#[derive(Error, Debug, Diagnostic)]
pub enum ControllerError {
    /// Object vanished between read and write
    #[error("Resource not found: {resource_key}")]
    #[diagnostic(
        code(podchaos::controller::not_found),
        help("The object was deleted concurrently. This is recovered on the next cycle")
    )]
    NotFound {
        #[allow(unused)]
        resource_key: String,
    },

    /// Write against a stale resourceVersion
    #[error("Conflict writing {resource_key}: {message}")]
    #[diagnostic(
        code(podchaos::controller::conflict),
        help("The object was modified concurrently. The next reconcile re-reads it and retries")
    )]
    Conflict {
        #[allow(unused)]
        resource_key: String,
        #[allow(unused)]
        message: String,
    },

    /// Selector malformed or candidate listing failed
    #[error("Target selection failed in namespace '{namespace}': {message}")]
    #[diagnostic(
        code(podchaos::controller::selection_failed),
        help("Check spec.selector on the Monkey and that the controller may list pods in '{namespace}'")
    )]
    SelectionError {
        #[allow(unused)]
        namespace: String,
        #[allow(unused)]
        message: String,
    },

    /// Interval text could not be parsed
    #[error("Invalid interval '{interval}': {reason}")]
    #[diagnostic(
        code(podchaos::controller::invalid_interval),
        help("Use a duration such as \"30s\", \"5m\" or \"1h30m\". Valid units are ns, us, ms, s, m, h")
    )]
    InvalidInterval {
        #[allow(unused)]
        interval: String,
        #[allow(unused)]
        reason: String,
    },

    /// Pod deletion failed for a reason other than not-found
    #[error("Failed to terminate pod {pod}: {message}")]
    #[diagnostic(
        code(podchaos::controller::termination_failed),
        help("Verify the controller has delete permission on pods. The next cycle selects a target again")
    )]
    TerminationError {
        #[allow(unused)]
        pod: String,
        #[allow(unused)]
        message: String,
    },

    /// Status write failed
    #[error("Failed to persist status of {monkey}: {message}")]
    #[diagnostic(
        code(podchaos::controller::persist_failed),
        help("Status writes are retried on the next delivered cycle")
    )]
    PersistError {
        #[allow(unused)]
        monkey: String,
        #[allow(unused)]
        message: String,
    },

    /// API server request failed
    #[error("API request failed: {message}")]
    #[diagnostic(
        code(podchaos::controller::api_error),
        help("Check that the API server at --api-url is reachable and the token is valid")
    )]
    ApiError {
        #[allow(unused)]
        status: Option<u16>,
        #[allow(unused)]
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(podchaos::controller::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Internal error
    #[error("Internal controller error: {message}")]
    #[diagnostic(
        code(podchaos::controller::internal_error),
        help("This is likely a bug in podchaos-controller. Please report it with the full error details")
    )]
    InternalError {
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

impl ControllerError {
    pub fn not_found(resource_key: impl Into<String>) -> Self {
        Self::NotFound {
            resource_key: resource_key.into(),
        }
    }

    pub fn conflict(resource_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource_key: resource_key.into(),
            message: message.into(),
        }
    }

    pub fn selection_error(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SelectionError {
            namespace: namespace.into(),
            message: message.into(),
        }
    }

    pub fn invalid_interval(interval: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            interval: interval.into(),
            reason: reason.into(),
        }
    }

    pub fn termination_error(pod: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TerminationError {
            pod: pod.into(),
            message: message.into(),
        }
    }

    pub fn persist_error(monkey: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PersistError {
            monkey: monkey.into(),
            message: message.into(),
        }
    }

    pub fn api_error(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
