use crate::action::ReconcileError;
use crate::error::ControllerError;
use crate::interval::{resolve_interval, DEFAULT_INTERVAL};
use crate::target::{Candidate, TargetSelector};
use crate::traits::ClusterClient;
use podchaos_core::Monkey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pods are killed immediately, without a graceful shutdown window
pub const TERMINATION_GRACE_PERIOD_SECONDS: i64 = 0;

/// What one experiment cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentOutcome {
    /// No pod matched the selector
    NoCandidate,
    /// Dry run: the pod would have been terminated
    Noop(Candidate),
    /// The pod was terminated
    Terminated(Candidate),
    /// The pod disappeared before the delete landed
    AlreadyGone(Candidate),
}

/// Result of a successful experiment cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub outcome: ExperimentOutcome,
    pub requeue_after: Duration,
}

/// Runs one chaos experiment: pick a target, then kill it or log it
pub struct ExperimentExecutor {
    client: Arc<dyn ClusterClient>,
    targets: TargetSelector,
}

impl ExperimentExecutor {
    pub fn new(client: Arc<dyn ClusterClient>, targets: TargetSelector) -> Self {
        Self { client, targets }
    }

    /// Perform at most one termination for `monkey`.
    ///
    /// Selection errors carry no requeue hint. An invalid interval or a
    /// failed delete is returned together with the requeue hint so the
    /// experiment keeps being scheduled.
    pub async fn execute(&self, monkey: &Monkey) -> Result<Experiment, ReconcileError> {
        let monkey_name = monkey.metadata.name.as_deref().unwrap_or("<unknown>");
        let namespace = monkey.target_namespace();

        let target = self.targets.select(namespace, &monkey.spec.selector).await?;

        let requeue_after = resolve_interval(&monkey.spec.interval)
            .map_err(|e| ReconcileError::with_requeue(e, DEFAULT_INTERVAL))?;

        let Some(target) = target else {
            info!(
                monkey = %monkey_name,
                namespace = %namespace,
                "No pods match selector, nothing to terminate"
            );
            return Ok(Experiment {
                outcome: ExperimentOutcome::NoCandidate,
                requeue_after,
            });
        };

        if monkey.spec.noop {
            info!(
                monkey = %monkey_name,
                pod = %target,
                "No operation specified, would have deleted pod"
            );
            return Ok(Experiment {
                outcome: ExperimentOutcome::Noop(target),
                requeue_after,
            });
        }

        let outcome = match self
            .client
            .delete_pod(
                &target.namespace,
                &target.name,
                TERMINATION_GRACE_PERIOD_SECONDS,
            )
            .await
        {
            Ok(()) => {
                info!(monkey = %monkey_name, pod = %target, "Deleted pod");
                ExperimentOutcome::Terminated(target)
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    monkey = %monkey_name,
                    pod = %target,
                    "Pod was already gone when deleting it"
                );
                ExperimentOutcome::AlreadyGone(target)
            }
            Err(e) => {
                return Err(ReconcileError::with_requeue(
                    ControllerError::termination_error(target.to_string(), e.to_string()),
                    requeue_after,
                ));
            }
        };

        Ok(Experiment {
            outcome,
            requeue_after,
        })
    }
}
