use crate::action::{Action, ReconcileError};
use crate::executor::ExperimentExecutor;
use crate::status::{Registration, StatusManager};
use crate::target::{RandomIndex, TargetSelector};
use crate::traits::ClusterClient;
use podchaos_core::ObjectKey;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Reconciles Monkey objects: registers new ones, runs experiments on the rest
///
/// Every call re-reads the Monkey and derives what to do from its status
/// alone, so calls may be repeated or replayed after a failure.
pub struct MonkeyReconciler {
    client: Arc<dyn ClusterClient>,
    status: StatusManager,
    executor: ExperimentExecutor,
}

impl MonkeyReconciler {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        let targets = TargetSelector::new(client.clone());
        Self::with_targets(client, targets)
    }

    /// Reconciler whose target choice comes from `random`
    pub fn with_random(client: Arc<dyn ClusterClient>, random: Arc<dyn RandomIndex>) -> Self {
        let targets = TargetSelector::with_random(client.clone(), random);
        Self::with_targets(client, targets)
    }

    fn with_targets(client: Arc<dyn ClusterClient>, targets: TargetSelector) -> Self {
        Self {
            status: StatusManager::new(client.clone()),
            executor: ExperimentExecutor::new(client.clone(), targets),
            client,
        }
    }

    /// Reconcile one Monkey
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Action, ReconcileError> {
        debug!(monkey = %key, "Looking for monkey");

        let mut monkey = match self.client.get_monkey(key).await {
            Ok(m) => m,
            Err(e) if e.is_not_found() => {
                debug!(monkey = %key, "Monkey no longer exists");
                return Ok(Action::await_change());
            }
            Err(e) => {
                error!(monkey = %key, error = %e, "Unable to fetch monkey");
                return Err(e.into());
            }
        };

        match self.status.ensure_registered(&mut monkey) {
            Registration::NewlyRegistered => {
                info!(monkey = %key, "Registering monkey");
                self.status.persist(&monkey).await
            }
            Registration::AlreadyRegistered => {
                let experiment = self.executor.execute(&monkey).await?;
                debug!(
                    monkey = %key,
                    outcome = ?experiment.outcome,
                    requeue_after = ?experiment.requeue_after,
                    "Experiment cycle complete"
                );
                Ok(Action::after_interval(experiment.requeue_after))
            }
        }
    }
}
