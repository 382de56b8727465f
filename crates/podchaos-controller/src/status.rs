use crate::action::{Action, ReconcileError};
use crate::error::ControllerError;
use crate::interval::{resolve_interval, DEFAULT_INTERVAL};
use crate::traits::ClusterClient;
use podchaos_core::{Monkey, Resource};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of checking a Monkey's registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The Registered condition was just appended and must be persisted
    NewlyRegistered,
    /// The Monkey already carries conditions; run the experiment
    AlreadyRegistered,
}

/// Owns the Monkey status subresource
pub struct StatusManager {
    client: Arc<dyn ClusterClient>,
}

impl StatusManager {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Append the Registered condition to a Monkey that has no conditions
    pub fn ensure_registered(&self, monkey: &mut Monkey) -> Registration {
        if monkey.is_registered() {
            return Registration::AlreadyRegistered;
        }
        let condition = monkey.registered_condition();
        monkey.status.conditions.push(condition);
        Registration::NewlyRegistered
    }

    /// Write `monkey.status` onto a freshly fetched copy of the object.
    ///
    /// A Monkey deleted in the meantime is not an error. A failed write is
    /// logged and left for the next cycle; the returned action still carries
    /// the Monkey's interval.
    pub async fn persist(&self, monkey: &Monkey) -> Result<Action, ReconcileError> {
        let key = monkey.object_key().map_err(|e| {
            ControllerError::internal_error(format!("Monkey has no identity: {}", e))
        })?;

        let mut latest = match self.client.get_monkey(&key).await {
            Ok(m) => m,
            Err(e) if e.is_not_found() => {
                info!(monkey = %key, "Monkey deleted before status update, nothing to persist");
                return Ok(Action::await_change());
            }
            Err(e) => {
                error!(monkey = %key, error = %e, "Unable to fetch monkey");
                return Err(e.into());
            }
        };

        latest.status = monkey.status.clone();
        match self.client.update_monkey_status(&latest).await {
            Ok(_) => {
                info!(
                    monkey = %key,
                    conditions = latest.status.conditions.len(),
                    "Updated monkey status"
                );
            }
            Err(e) => {
                let conflict = e.is_conflict();
                let err = ControllerError::persist_error(key.to_string(), e.to_string());
                if conflict {
                    warn!(monkey = %key, error = %err, "Status update conflicted, retrying next cycle");
                } else {
                    error!(monkey = %key, error = %err, "Unable to update monkey status");
                }
            }
        }

        resolve_interval(&monkey.spec.interval)
            .map(Action::after_interval)
            .map_err(|e| ReconcileError::with_requeue(e, DEFAULT_INTERVAL))
    }
}
