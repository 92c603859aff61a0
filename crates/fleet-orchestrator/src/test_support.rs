//! Shared fixtures and test doubles for the crate's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::context::ScheduleContext;
use crate::errors::{ClientError, SchedulerError};
use crate::traits::*;
use crate::types::*;

pub fn trigger(name: &str, expression: &str) -> Trigger {
    let now = Utc::now();
    Trigger {
        id: format!("trigger-{name}"),
        execution_goal_id: "goal-1".into(),
        name: name.into(),
        recurrence_expression: expression.into(),
        enabled: true,
        team_name: "fleet".into(),
        version: 1,
        created: now,
        last_modified: now,
    }
}

pub fn execution_goal(id: &str) -> ExecutionGoalDefinition {
    ExecutionGoalDefinition {
        id: id.into(),
        team_name: "fleet".into(),
        experiment_name: "gen6-bios-validation".into(),
        enabled: true,
        experiment_template: ExperimentTemplate {
            name: "gen6-bios-validation".into(),
            ..ExperimentTemplate::default()
        },
        parameters: Parameters::new(),
        control_goals: Vec::new(),
        target_goals: Vec::new(),
    }
}

pub fn context(goal: ExecutionGoalDefinition, trigger: Trigger) -> ScheduleContext {
    ScheduleContext::new(
        Arc::new(goal),
        trigger,
        Arc::new(SchedulerConfig::default()),
        Utc::now(),
    )
}

pub fn goal(name: &str, preconditions: Vec<Condition>, actions: Vec<Action>) -> Goal {
    Goal {
        name: name.into(),
        preconditions,
        actions,
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Condition whose outcome is fixed at construction; counts evaluations.
pub struct FixedCondition {
    provider_type: String,
    outcome: Option<bool>,
    pub calls: AtomicUsize,
}

impl FixedCondition {
    pub fn new(provider_type: &str, satisfied: bool) -> Self {
        Self {
            provider_type: provider_type.into(),
            outcome: Some(satisfied),
            calls: AtomicUsize::new(0),
        }
    }

    /// A condition whose evaluation always errors.
    pub fn failing(provider_type: &str) -> Self {
        Self {
            provider_type: provider_type.into(),
            outcome: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConditionProvider for FixedCondition {
    fn provider_type(&self) -> &str {
        &self.provider_type
    }

    async fn evaluate(
        &self,
        _condition: &Condition,
        _ctx: &ScheduleContext,
        _cancel: &CancellationToken,
    ) -> Result<ConditionResult, SchedulerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Some(satisfied) => Ok(ConditionResult::satisfied(satisfied)),
            None => Err(SchedulerError::Downstream(ClientError::Transport {
                operation: "count_experiments".into(),
                message: "telemetry unavailable".into(),
            })),
        }
    }
}

/// Action recording the trigger name of every execution.
///
/// Fails for triggers listed in `fail_for`.
pub struct RecordingAction {
    provider_type: String,
    fail_for: Vec<String>,
    pub executed: Mutex<Vec<String>>,
}

impl RecordingAction {
    pub fn new(provider_type: &str) -> Self {
        Self {
            provider_type: provider_type.into(),
            fail_for: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(provider_type: &str, trigger_names: &[&str]) -> Self {
        Self {
            fail_for: trigger_names.iter().map(|s| s.to_string()).collect(),
            ..Self::new(provider_type)
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl ActionProvider for RecordingAction {
    fn provider_type(&self) -> &str {
        &self.provider_type
    }

    async fn execute(
        &self,
        _action: &Action,
        ctx: &ScheduleContext,
        _cancel: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        let name = ctx.trigger().name.clone();
        self.executed.lock().push(name.clone());
        if self.fail_for.contains(&name) {
            return Err(SchedulerError::Downstream(ClientError::Status {
                operation: "create_experiment".into(),
                status: 500,
                message: format!("rejected experiment for {name}"),
            }));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Remote services
// ---------------------------------------------------------------------------

/// Experiment client recording submitted templates.
#[derive(Default)]
pub struct RecordingExperimentClient {
    pub submitted: Mutex<Vec<ExperimentTemplate>>,
    pub reject_with: Option<u16>,
}

impl RecordingExperimentClient {
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<ExperimentTemplate> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl ExperimentClient for RecordingExperimentClient {
    async fn create_experiment(
        &self,
        template: &ExperimentTemplate,
    ) -> Result<ExperimentInstance, ClientError> {
        if let Some(status) = self.reject_with {
            return Err(ClientError::Status {
                operation: "create_experiment".into(),
                status,
                message: "rejected".into(),
            });
        }
        let mut submitted = self.submitted.lock();
        submitted.push(template.clone());
        Ok(ExperimentInstance {
            experiment_id: format!("exp-{}", submitted.len()),
            experiment_name: template.name.clone(),
        })
    }
}

/// Reservation service returning a fixed candidate list.
pub struct FixedReservation {
    pub candidates: Vec<EnvironmentCandidate>,
    pub queries: Mutex<Vec<EnvironmentQuery>>,
}

impl FixedReservation {
    pub fn new(node_ids: &[&str]) -> Self {
        Self {
            candidates: node_ids
                .iter()
                .map(|id| EnvironmentCandidate {
                    node_id: id.to_string(),
                    subscription: "sub-1".into(),
                    vm_sku: vec!["Standard_D4".into(), "Standard_D8".into()],
                    cluster_id: "cluster-1".into(),
                })
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EnvironmentReservation for FixedReservation {
    async fn reserve_candidates(
        &self,
        query: &EnvironmentQuery,
    ) -> Result<Vec<EnvironmentCandidate>, ClientError> {
        self.queries.lock().push(query.clone());
        Ok(self
            .candidates
            .iter()
            .take(query.node_count as usize)
            .cloned()
            .collect())
    }
}

/// History returning a fixed count per outcome; records queries.
pub struct FixedHistory {
    pub succeeded: u64,
    pub failed: u64,
    pub in_progress: u64,
    pub queries: Mutex<Vec<ExperimentQuery>>,
}

impl FixedHistory {
    pub fn new(succeeded: u64, failed: u64, in_progress: u64) -> Self {
        Self {
            succeeded,
            failed,
            in_progress,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ExperimentHistory for FixedHistory {
    async fn count_experiments(&self, query: &ExperimentQuery) -> Result<u64, ClientError> {
        self.queries.lock().push(query.clone());
        Ok(match query.outcome {
            ExperimentOutcome::Succeeded => self.succeeded,
            ExperimentOutcome::Failed => self.failed,
            ExperimentOutcome::InProgress => self.in_progress,
        })
    }
}
