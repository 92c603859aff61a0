//! Plugin trait interfaces for the orchestrator.
//!
//! Every external collaborator and every pluggable provider is an async
//! trait. In-memory implementations live in [`defaults`](crate::defaults).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::context::ScheduleContext;
use super::errors::*;
use super::types::*;

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Evaluates one kind of [`Condition`], keyed by its provider type.
#[async_trait]
pub trait ConditionProvider: Send + Sync {
    /// The string key conditions use to select this provider.
    fn provider_type(&self) -> &str;

    async fn evaluate(
        &self,
        condition: &Condition,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<ConditionResult, SchedulerError>;
}

/// Executes one kind of [`Action`], keyed by its provider type.
#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// The string key actions use to select this provider.
    fn provider_type(&self) -> &str;

    async fn execute(
        &self,
        action: &Action,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<(), SchedulerError>;
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Durable store of recurring triggers.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    async fn list_enabled_triggers(&self) -> Result<Vec<Trigger>, StoreError>;

    async fn update_trigger(&self, trigger: &Trigger) -> Result<(), StoreError>;
}

/// Durable store of execution-goal definitions.
#[async_trait]
pub trait ExecutionGoalStore: Send + Sync {
    async fn get_execution_goal(
        &self,
        execution_goal_id: &str,
        team_name: &str,
    ) -> Result<ExecutionGoalDefinition, StoreError>;
}

/// Store of experiment step instances, read by the monitoring runtime.
#[async_trait]
pub trait StepStore: Send + Sync {
    async fn create_steps(&self, steps: &[ExperimentStepInstance]) -> Result<(), StoreError>;

    async fn get_step(&self, step_id: &str) -> Result<ExperimentStepInstance, StoreError>;

    async fn update_step(&self, step: &ExperimentStepInstance) -> Result<(), StoreError>;

    /// Agent steps spawned by a monitoring step, in sequence order.
    async fn list_child_steps(
        &self,
        parent_step_id: &str,
    ) -> Result<Vec<ExperimentStepInstance>, StoreError>;
}

// ---------------------------------------------------------------------------
// Remote services
// ---------------------------------------------------------------------------

/// Submits new experiments.
#[async_trait]
pub trait ExperimentClient: Send + Sync {
    async fn create_experiment(
        &self,
        template: &ExperimentTemplate,
    ) -> Result<ExperimentInstance, ClientError>;
}

/// Reserves nodes for new experiments.
#[async_trait]
pub trait EnvironmentReservation: Send + Sync {
    async fn reserve_candidates(
        &self,
        query: &EnvironmentQuery,
    ) -> Result<Vec<EnvironmentCandidate>, ClientError>;
}

/// Counts past experiments (backed by a telemetry cache in production).
#[async_trait]
pub trait ExperimentHistory: Send + Sync {
    async fn count_experiments(&self, query: &ExperimentQuery) -> Result<u64, ClientError>;
}

/// Resolves which agents run an experiment's remotely-targeted steps.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn agents_for(
        &self,
        experiment_id: &str,
        target: ExecutionTarget,
    ) -> Result<Vec<String>, StoreError>;
}
