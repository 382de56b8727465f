// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod action;
pub mod api_client;
pub mod controller;
pub mod error;
pub mod executor;
pub mod interval;
pub mod mock;
pub mod reconciler;
pub mod status;
pub mod target;
pub mod traits;

// Re-export primary types
pub use action::{Action, ReconcileError};
pub use error::{ControllerError, Result};
pub use interval::{parse_duration, resolve_interval, DEFAULT_INTERVAL};
pub use mock::{Fault, MockCluster};
pub use traits::ClusterClient;

// Re-export the reconciliation pipeline
pub use api_client::ApiClient;
pub use controller::{ControllerConfig, MonkeyController, Schedule};
pub use executor::{Experiment, ExperimentExecutor, ExperimentOutcome};
pub use reconciler::MonkeyReconciler;
pub use status::{Registration, StatusManager};
pub use target::{Candidate, RandomIndex, TargetSelector, TimeSeededRandom};
