//! Scheduler builder: assembles stores, remote clients and providers.

use std::sync::Arc;

use super::{Coordinator, GoalEvaluator, Scheduler};
use crate::config::SchedulerConfig;
use crate::defaults::{
    InMemoryExecutionGoalStore, InMemoryStepStore, InMemoryTriggerStore, StaticAgentDirectory,
};
use crate::providers::{
    CreateExperimentAction, DisableTriggerAction, ExperimentHistoryCondition,
    SelectEnvironmentAction, TimerCondition,
};
use crate::registry::ProviderRegistry;
use crate::traits::{
    ActionProvider, AgentDirectory, ConditionProvider, EnvironmentReservation, ExecutionGoalStore,
    ExperimentClient, ExperimentHistory, StepStore, TriggerStore,
};

/// Builder for assembling the [`Scheduler`].
///
/// Stores default to the in-memory implementations. Built-in providers are
/// registered for every collaborator that is set: `timer` and
/// `disable_trigger` always, the experiment-history conditions with an
/// [`ExperimentHistory`], `create_experiment` with an [`ExperimentClient`]
/// and `select_environment` with an [`EnvironmentReservation`]. Providers
/// registered explicitly replace built-ins of the same type.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    trigger_store: Option<Arc<dyn TriggerStore>>,
    goal_store: Option<Arc<dyn ExecutionGoalStore>>,
    step_store: Option<Arc<dyn StepStore>>,
    agents: Option<Arc<dyn AgentDirectory>>,
    experiment_client: Option<Arc<dyn ExperimentClient>>,
    reservation: Option<Arc<dyn EnvironmentReservation>>,
    history: Option<Arc<dyn ExperimentHistory>>,
    conditions: Vec<Arc<dyn ConditionProvider>>,
    actions: Vec<Arc<dyn ActionProvider>>,
}

impl SchedulerBuilder {
    pub(super) fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            trigger_store: None,
            goal_store: None,
            step_store: None,
            agents: None,
            experiment_client: None,
            reservation: None,
            history: None,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Set the configuration. Default: [`SchedulerConfig::default`].
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the trigger store. Default: [`InMemoryTriggerStore`].
    pub fn trigger_store(mut self, store: impl TriggerStore + 'static) -> Self {
        self.trigger_store = Some(Arc::new(store));
        self
    }

    /// Set the execution-goal store. Default: [`InMemoryExecutionGoalStore`].
    pub fn execution_goal_store(mut self, store: impl ExecutionGoalStore + 'static) -> Self {
        self.goal_store = Some(Arc::new(store));
        self
    }

    /// Set the step store. Default: [`InMemoryStepStore`].
    pub fn step_store(mut self, store: impl StepStore + 'static) -> Self {
        self.step_store = Some(Arc::new(store));
        self
    }

    /// Set the agent directory. Default: an empty [`StaticAgentDirectory`].
    pub fn agent_directory(mut self, agents: impl AgentDirectory + 'static) -> Self {
        self.agents = Some(Arc::new(agents));
        self
    }

    pub fn experiment_client(mut self, client: Arc<dyn ExperimentClient>) -> Self {
        self.experiment_client = Some(client);
        self
    }

    pub fn environment_reservation(mut self, reservation: Arc<dyn EnvironmentReservation>) -> Self {
        self.reservation = Some(reservation);
        self
    }

    pub fn experiment_history(mut self, history: Arc<dyn ExperimentHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Register a condition provider. Keyed by its `provider_type()`.
    pub fn condition(mut self, provider: Arc<dyn ConditionProvider>) -> Self {
        self.conditions.push(provider);
        self
    }

    /// Register an action provider. Keyed by its `provider_type()`.
    pub fn action(mut self, provider: Arc<dyn ActionProvider>) -> Self {
        self.actions.push(provider);
        self
    }

    /// Assemble the scheduler. A `tick_interval` longer than twice the
    /// grace window is logged at `warn`: occurrences falling between two
    /// windows would never fire.
    pub fn build(self) -> Scheduler {
        if !self.config.ticks_cover_every_occurrence() {
            tracing::warn!(
                environment = %self.config.environment,
                tick_interval = ?self.config.tick_interval,
                grace_window = ?self.config.grace_window,
                "tick interval exceeds twice the grace window; some occurrences will not fire"
            );
        }

        let triggers: Arc<dyn TriggerStore> = self
            .trigger_store
            .unwrap_or_else(|| Arc::new(InMemoryTriggerStore::new()));
        let goals: Arc<dyn ExecutionGoalStore> = self
            .goal_store
            .unwrap_or_else(|| Arc::new(InMemoryExecutionGoalStore::new()));
        let steps: Arc<dyn StepStore> = self
            .step_store
            .unwrap_or_else(|| Arc::new(InMemoryStepStore::new()));
        let agents: Arc<dyn AgentDirectory> = self
            .agents
            .unwrap_or_else(|| Arc::new(StaticAgentDirectory::new()));

        // Built-ins first so explicit registrations replace them.
        let registry = ProviderRegistry::new();
        registry.register_condition(Arc::new(TimerCondition));
        registry.register_action(Arc::new(DisableTriggerAction::new(Arc::clone(&triggers))));
        if let Some(history) = self.history {
            registry.register_condition(Arc::new(ExperimentHistoryCondition::failed_experiments(
                Arc::clone(&history),
            )));
            registry.register_condition(Arc::new(
                ExperimentHistoryCondition::successful_experiments(Arc::clone(&history)),
            ));
            registry.register_condition(Arc::new(
                ExperimentHistoryCondition::in_progress_experiments(history),
            ));
        }
        if let Some(client) = self.experiment_client {
            registry.register_action(Arc::new(CreateExperimentAction::new(client)));
        }
        if let Some(reservation) = self.reservation {
            registry.register_action(Arc::new(SelectEnvironmentAction::new(reservation)));
        }
        for provider in self.conditions {
            registry.register_condition(provider);
        }
        for provider in self.actions {
            registry.register_action(provider);
        }

        tracing::debug!(
            conditions = ?registry.condition_types(),
            actions = ?registry.action_types(),
            "scheduler providers registered"
        );

        Scheduler {
            triggers,
            goals,
            steps,
            agents,
            coordinator: Coordinator::new(GoalEvaluator::new(registry.clone())),
            registry,
            config: Arc::new(self.config),
        }
    }
}
