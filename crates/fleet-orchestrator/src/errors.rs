//! Error types for all scheduling, step-factory and monitoring operations.

use thiserror::Error;

/// Errors from [`TriggerStore`](super::traits::TriggerStore),
/// [`ExecutionGoalStore`](super::traits::ExecutionGoalStore) and
/// [`StepStore`](super::traits::StepStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {id}")]
    NotFound { id: String },
    #[error("store error: {message}")]
    Store { message: String },
}

/// Errors from the remote collaborators: experiment submission, environment
/// reservation and experiment history queries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote service answered with a non-success status.
    #[error("{operation} returned HTTP {status}: {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },
    /// The request never produced a response.
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },
}

/// Errors raised while evaluating goals, conditions and actions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulerError {
    /// No condition or action provider is registered under the type name.
    #[error("no provider registered for type '{provider_type}'")]
    UnknownProvider { provider_type: String },
    /// A cron expression could not be parsed.
    #[error("invalid recurrence expression '{expression}': {message}")]
    Recurrence { expression: String, message: String },
    /// Parameters are missing or have the wrong declared type.
    #[error("schema error: {message}")]
    Schema { message: String },
    /// An execution goal has no target goal named after the firing trigger.
    #[error("execution goal '{execution_goal_id}' has no target goal for trigger '{trigger_name}'")]
    MissingTargetGoal {
        execution_goal_id: String,
        trigger_name: String,
    },
    /// The reservation service returned fewer nodes than requested.
    #[error("environment unavailable: requested {requested} nodes, reserved {reserved}")]
    EnvironmentUnavailable { requested: u32, reserved: usize },
    /// A downstream call failed.
    #[error("downstream error: {0}")]
    Downstream(#[from] ClientError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("scheduling pass cancelled")]
    Cancelled,
}

impl SchedulerError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}

/// Errors from the [`StepFactory`](crate::steps::StepFactory).
#[derive(Debug, Error)]
pub enum StepFactoryError {
    /// The component definition is invalid for the requested build.
    #[error("component '{component}': {message}")]
    Schema { component: String, message: String },
    /// A remotely-executed component has a step type without a monitor.
    #[error("component '{component}': step type '{step_type}' has no monitoring provider")]
    UnmappedStepType { component: String, step_type: String },
}

/// Errors from the [`MonitorRuntime`](crate::steps::MonitorRuntime).
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitoring step '{step_id}' timed out after {elapsed_secs}s")]
    Timeout { step_id: String, elapsed_secs: u64 },
    #[error("monitoring step '{step_id}': {message}")]
    Definition { step_id: String, message: String },
    #[error("step factory error: {0}")]
    Factory(#[from] StepFactoryError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("monitoring cancelled")]
    Cancelled,
}
