use crate::error::ControllerError;
use std::time::Duration;

/// What the delivery loop should do after a successful reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Reconcile the same object again after `duration`
    pub fn requeue(duration: Duration) -> Self {
        Self {
            requeue_after: Some(duration),
        }
    }

    /// Requeue after a Monkey's experiment interval.
    ///
    /// A zero interval is never repeated on a timer: the object waits for a change.
    pub fn after_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            Self::await_change()
        } else {
            Self::requeue(interval)
        }
    }

    /// Do not schedule another reconcile; wait for the object to change
    pub fn await_change() -> Self {
        Self {
            requeue_after: None,
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// A failed reconcile, optionally carrying an explicit requeue hint.
///
/// When a hint is present it takes precedence over the delivery loop's
/// error backoff.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ReconcileError {
    #[source]
    error: ControllerError,
    requeue_after: Option<Duration>,
}

impl ReconcileError {
    /// Error without a requeue hint; the caller's backoff applies
    pub fn new(error: ControllerError) -> Self {
        Self {
            error,
            requeue_after: None,
        }
    }

    /// Error that still asks to be reconciled again after `duration`.
    ///
    /// A zero duration carries no hint, leaving the caller's backoff in charge.
    pub fn with_requeue(error: ControllerError, duration: Duration) -> Self {
        Self {
            error,
            requeue_after: Some(duration).filter(|d| !d.is_zero()),
        }
    }

    pub fn error(&self) -> &ControllerError {
        &self.error
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

impl From<ControllerError> for ReconcileError {
    fn from(error: ControllerError) -> Self {
        Self::new(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_constructors() {
        assert_eq!(
            Action::requeue(Duration::from_secs(30)).requeue_after(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(Action::await_change().requeue_after(), None);
    }

    #[test]
    fn test_zero_interval_is_not_a_timer() {
        assert_eq!(Action::after_interval(Duration::ZERO), Action::await_change());
        assert_eq!(
            Action::after_interval(Duration::from_millis(1)).requeue_after(),
            Some(Duration::from_millis(1))
        );

        let err = ReconcileError::with_requeue(
            ControllerError::termination_error("workloads/web-1", "forbidden"),
            Duration::ZERO,
        );
        assert_eq!(err.requeue_after(), None);
    }

    #[test]
    fn test_reconcile_error_keeps_hint_and_message() {
        let err = ReconcileError::with_requeue(
            ControllerError::termination_error("workloads/web-1", "forbidden"),
            Duration::from_secs(300),
        );
        assert_eq!(err.requeue_after(), Some(Duration::from_secs(300)));
        assert_eq!(
            err.to_string(),
            "Failed to terminate pod workloads/web-1: forbidden"
        );
        assert!(matches!(
            err.error(),
            ControllerError::TerminationError { .. }
        ));
    }

    #[test]
    fn test_from_controller_error_has_no_hint() {
        let err: ReconcileError = ControllerError::internal_error("boom").into();
        assert_eq!(err.requeue_after(), None);
    }
}
