//! Fleet orchestrator: goal-based scheduling of hardware-validation
//! experiments and the step factory that turns experiment workflows into
//! sequenced, remotely-monitored steps.
//!
//! On every tick the [`Scheduler`] selects the triggers that are due,
//! evaluates each trigger's execution goal (control goals first, then the
//! matching target goal) and runs the target goal's actions, which
//! typically reserve an environment and submit a new experiment. The
//! [`StepFactory`] and [`MonitorRuntime`] cover the experiment side.
//!
//! Stores, remote services and providers are async traits; in-memory
//! implementations live in [`defaults`]. No tracing subscriber is installed.

pub mod clients;
pub mod config;
pub mod context;
pub mod defaults;
pub mod errors;
pub mod providers;
pub mod registry;
pub mod scheduler;
pub mod steps;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export public types at the crate level.

// clients
pub use clients::HttpExperimentClient;

// config / context
pub use config::SchedulerConfig;
pub use context::{ScheduleContext, PARAMETER_REFERENCE_PREFIX};

// defaults
pub use defaults::{
    InMemoryExecutionGoalStore, InMemoryStepStore, InMemoryTriggerStore, StaticAgentDirectory,
};

// errors
pub use errors::{ClientError, MonitorError, SchedulerError, StepFactoryError, StoreError};

// providers
pub use providers::{
    CreateExperimentAction, DisableTriggerAction, ExperimentHistoryCondition,
    SelectEnvironmentAction, TimerCondition,
};

// registry
pub use registry::ProviderRegistry;

// scheduler
pub use scheduler::{
    select_candidates, CoordinationOutcome, CoordinationReport, Coordinator, GoalEvaluator,
    Scheduler, SchedulerBuilder, SchedulerHost, SchedulingPassReport,
};

// steps
pub use steps::{aggregate_status, monitoring_component, MonitorRuntime, StepFactory};

// traits
pub use traits::{
    ActionProvider, AgentDirectory, ConditionProvider, EnvironmentReservation, ExecutionGoalStore,
    ExperimentClient, ExperimentHistory, StepStore, TriggerStore,
};

// types
pub use types::{
    Action, Condition, ConditionResult, EnvironmentCandidate, EnvironmentQuery,
    ExecutionGoalDefinition, ExecutionStatus, ExecutionTarget, ExperimentComponent,
    ExperimentInstance, ExperimentOutcome, ExperimentQuery, ExperimentStepInstance,
    ExperimentTemplate, Goal, ParameterValue, Parameters, StepType, Trigger, ALL_GROUPS,
    TIMER_CONDITION_TYPE,
};
