//! Goal-based scheduling: the single entry point for a scheduling pass.
//!
//! The [`Scheduler`] selects the triggers due at a tick, loads each
//! trigger's execution goal and coordinates it. Construct via
//! [`Scheduler::builder()`].
//!
//! ```rust,ignore
//! let scheduler = Scheduler::builder()
//!     .trigger_store(triggers)
//!     .execution_goal_store(goals)
//!     .experiment_client(Arc::new(HttpExperimentClient::new("https://experiments.internal")))
//!     .build();
//!
//! let report = scheduler.run_scheduling_pass(&CancellationToken::new()).await?;
//! ```

mod builder;
pub mod coordinator;
pub mod goal_evaluator;
mod host;
pub mod trigger_evaluator;

pub use builder::SchedulerBuilder;
pub use coordinator::{CoordinationOutcome, CoordinationReport, Coordinator};
pub use goal_evaluator::GoalEvaluator;
pub use host::SchedulerHost;
pub use trigger_evaluator::{is_due, parse_recurrence, select_candidates};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::context::ScheduleContext;
use crate::errors::SchedulerError;
use crate::registry::ProviderRegistry;
use crate::steps::{MonitorRuntime, StepFactory};
use crate::traits::{AgentDirectory, ExecutionGoalStore, StepStore, TriggerStore};
use crate::types::Trigger;

/// Result of one scheduling pass.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulingPassReport {
    /// Environment name from the scheduler configuration.
    pub environment: String,
    /// The tick the pass evaluated triggers against.
    pub now: DateTime<Utc>,
    /// Number of enabled triggers listed by the store.
    pub triggers_evaluated: usize,
    /// One report per candidate trigger, ordered by trigger id.
    pub coordinations: Vec<CoordinationReport>,
}

impl SchedulingPassReport {
    pub fn for_trigger(&self, trigger_id: &str) -> Option<&CoordinationReport> {
        self.coordinations.iter().find(|r| r.trigger_id == trigger_id)
    }
}

/// The assembled scheduler.
///
/// Owns the stores, the provider registry and the configuration. All
/// internals are `Arc`-wrapped; one instance serves every pass.
pub struct Scheduler {
    pub(super) triggers: Arc<dyn TriggerStore>,
    pub(super) goals: Arc<dyn ExecutionGoalStore>,
    pub(super) steps: Arc<dyn StepStore>,
    pub(super) agents: Arc<dyn AgentDirectory>,
    pub(super) registry: ProviderRegistry,
    pub(super) coordinator: Coordinator,
    pub(super) config: Arc<SchedulerConfig>,
}

impl Scheduler {
    /// Create a new [`SchedulerBuilder`].
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// A monitoring runtime sharing this scheduler's step store, agent
    /// directory and configuration.
    pub fn monitor_runtime(&self) -> MonitorRuntime {
        MonitorRuntime::new(
            Arc::clone(&self.steps),
            Arc::clone(&self.agents),
            StepFactory::new(),
            Arc::clone(&self.config),
        )
    }

    /// Run one scheduling pass for the current time.
    pub async fn run_scheduling_pass(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SchedulingPassReport, SchedulerError> {
        self.run_scheduling_pass_at(Utc::now(), cancel).await
    }

    /// Run one scheduling pass for the tick at `now`.
    ///
    /// Only a failure to list triggers fails the pass. Every candidate is
    /// coordinated in its own task; a failing or panicking candidate is
    /// reported without affecting its siblings.
    pub async fn run_scheduling_pass_at(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<SchedulingPassReport, SchedulerError> {
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        let triggers = self.triggers.list_enabled_triggers().await?;
        let candidates = select_candidates(&triggers, now, self.config.grace_window);
        tracing::info!(
            environment = %self.config.environment,
            now = %now,
            triggers = triggers.len(),
            candidates = candidates.len(),
            "scheduling pass started"
        );

        let mut tasks = JoinSet::new();
        for trigger in candidates {
            let goals = Arc::clone(&self.goals);
            let coordinator = self.coordinator.clone();
            let config = Arc::clone(&self.config);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let trigger_id = trigger.id.clone();
                let execution_goal_id = trigger.execution_goal_id.clone();
                let coordination =
                    coordinate_candidate(goals, coordinator, config, trigger, now, cancel);

                AssertUnwindSafe(coordination)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let error = panic_message(panic.as_ref());
                        tracing::error!(
                            trigger_id = %trigger_id,
                            execution_goal_id = %execution_goal_id,
                            "coordination panicked: {error}"
                        );
                        CoordinationReport::new(
                            &trigger_id,
                            &execution_goal_id,
                            CoordinationOutcome::Failed { error },
                        )
                    })
            });
        }

        let mut coordinations = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => coordinations.push(report),
                Err(e) => tracing::error!("coordination task aborted: {e}"),
            }
        }
        coordinations.sort_by(|a, b| a.trigger_id.cmp(&b.trigger_id));

        tracing::info!(
            environment = %self.config.environment,
            now = %now,
            coordinations = coordinations.len(),
            "scheduling pass finished"
        );

        Ok(SchedulingPassReport {
            environment: self.config.environment.clone(),
            now,
            triggers_evaluated: triggers.len(),
            coordinations,
        })
    }
}

/// Load the trigger's execution goal and coordinate it.
async fn coordinate_candidate(
    goals: Arc<dyn ExecutionGoalStore>,
    coordinator: Coordinator,
    config: Arc<SchedulerConfig>,
    trigger: Trigger,
    now: DateTime<Utc>,
    cancel: CancellationToken,
) -> CoordinationReport {
    let definition = match goals
        .get_execution_goal(&trigger.execution_goal_id, &trigger.team_name)
        .await
    {
        Ok(definition) => definition,
        Err(e) => {
            tracing::error!(
                trigger_id = %trigger.id,
                execution_goal_id = %trigger.execution_goal_id,
                team_name = %trigger.team_name,
                "failed to load execution goal: {e}"
            );
            return CoordinationReport::new(
                &trigger.id,
                &trigger.execution_goal_id,
                CoordinationOutcome::Failed {
                    error: SchedulerError::from(e).to_string(),
                },
            );
        }
    };

    if !definition.enabled {
        tracing::info!(
            trigger_id = %trigger.id,
            execution_goal_id = %definition.id,
            "execution goal disabled, skipping"
        );
        return CoordinationReport::new(
            &trigger.id,
            &definition.id,
            CoordinationOutcome::Skipped {
                reason: "execution goal disabled".into(),
            },
        );
    }

    let ctx = ScheduleContext::new(Arc::new(definition), trigger, config, now);
    coordinator.coordinate(&ctx, &cancel).await
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
