//! Monitoring step runtime.
//!
//! A monitoring step lives in the orchestrator and watches the agent steps
//! it spawned for its child component:
//!
//! ```text
//! NotStarted -> spawn agent steps -> Polling -> Succeeded | Failed | Cancelled
//!                                           \-> timed out -> Failed
//! ```
//!
//! Each [`MonitorRuntime::poll`] re-reads the agent steps from the
//! [`StepStore`]. The provider-execution harness that calls `poll` is
//! outside this crate; [`MonitorRuntime::run_until_terminal`] is a minimal
//! stand-in for hosts that have none.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::factory::StepFactory;
use crate::config::SchedulerConfig;
use crate::errors::MonitorError;
use crate::traits::{AgentDirectory, StepStore};
use crate::types::{ExecutionStatus, ExperimentStepInstance};

/// Component parameter overriding the monitoring timeout.
pub const TIMEOUT_PARAMETER: &str = "timeout";

/// Fold agent step statuses into the monitoring step's status.
///
/// Any `Failed` wins, then any `Cancelled`; the group only succeeds when
/// every agent step succeeded. Anything else is still in progress.
pub fn aggregate_status(statuses: &[ExecutionStatus]) -> ExecutionStatus {
    if statuses.contains(&ExecutionStatus::Failed) {
        ExecutionStatus::Failed
    } else if statuses.contains(&ExecutionStatus::Cancelled) {
        ExecutionStatus::Cancelled
    } else if !statuses.is_empty() && statuses.iter().all(|s| *s == ExecutionStatus::Succeeded) {
        ExecutionStatus::Succeeded
    } else {
        ExecutionStatus::InProgress
    }
}

/// Drives monitoring steps built by the [`StepFactory`].
pub struct MonitorRuntime {
    steps: Arc<dyn StepStore>,
    agents: Arc<dyn AgentDirectory>,
    factory: StepFactory,
    config: Arc<SchedulerConfig>,
}

impl MonitorRuntime {
    pub fn new(
        steps: Arc<dyn StepStore>,
        agents: Arc<dyn AgentDirectory>,
        factory: StepFactory,
        config: Arc<SchedulerConfig>,
    ) -> Self {
        Self {
            steps,
            agents,
            factory,
            config,
        }
    }

    /// Advance one monitoring step by a single poll and persist it.
    ///
    /// Returns the step's new status. Timeouts and unusable definitions mark
    /// the step `Failed` before the error is returned.
    pub async fn poll(
        &self,
        step: &mut ExperimentStepInstance,
        cancel: &CancellationToken,
    ) -> Result<ExecutionStatus, MonitorError> {
        if cancel.is_cancelled() {
            return Err(MonitorError::Cancelled);
        }
        if step.status.is_terminal() {
            return Ok(step.status);
        }

        let now = Utc::now();
        if step.start_time.is_none() {
            step.start_time = Some(now);
        }

        let children = self.steps.list_child_steps(&step.id).await?;
        if children.is_empty() {
            return self.spawn_agent_steps(step).await;
        }

        let statuses: Vec<ExecutionStatus> = children.iter().map(|c| c.status).collect();
        let status = aggregate_status(&statuses);
        if status.is_terminal() {
            tracing::info!(
                step_id = %step.id,
                experiment_id = %step.experiment_id,
                status = ?status,
                "agent steps reached a terminal status"
            );
            self.finish(step, status).await?;
            return Ok(status);
        }

        let timeout = self.timeout_for(step);
        let elapsed = step
            .start_time
            .map(|start| (now - start).to_std().unwrap_or_default())
            .unwrap_or_default();
        if elapsed >= timeout {
            tracing::warn!(
                step_id = %step.id,
                experiment_id = %step.experiment_id,
                timeout_secs = timeout.as_secs(),
                "monitoring step timed out"
            );
            self.finish(step, ExecutionStatus::Failed).await?;
            return Err(MonitorError::Timeout {
                step_id: step.id.clone(),
                elapsed_secs: elapsed.as_secs(),
            });
        }

        step.status = ExecutionStatus::InProgress;
        step.last_modified = now;
        self.steps.update_step(step).await?;
        Ok(ExecutionStatus::InProgress)
    }

    /// Poll a stored monitoring step on the configured interval until it
    /// reaches a terminal status.
    pub async fn run_until_terminal(
        &self,
        step_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionStatus, MonitorError> {
        let mut step = self.steps.get_step(step_id).await?;
        loop {
            let status = self.poll(&mut step, cancel).await?;
            if status.is_terminal() {
                return Ok(status);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.monitor_poll_interval) => {}
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
            }
        }
    }

    fn timeout_for(&self, step: &ExperimentStepInstance) -> Duration {
        step.definition
            .parameters
            .get(TIMEOUT_PARAMETER)
            .and_then(|v| v.as_duration())
            .unwrap_or(self.config.monitor_timeout)
    }

    async fn spawn_agent_steps(
        &self,
        step: &mut ExperimentStepInstance,
    ) -> Result<ExecutionStatus, MonitorError> {
        let Some(child) = step.definition.components.first() else {
            self.finish(step, ExecutionStatus::Failed).await?;
            return Err(MonitorError::Definition {
                step_id: step.id.clone(),
                message: "monitoring step has no child component".into(),
            });
        };

        let agents = self
            .agents
            .agents_for(&step.experiment_id, child.target)
            .await?;
        if agents.is_empty() {
            let message = format!("no agents available for target {:?}", child.target);
            self.finish(step, ExecutionStatus::Failed).await?;
            return Err(MonitorError::Definition {
                step_id: step.id.clone(),
                message,
            });
        }

        let mut agent_steps = Vec::new();
        for agent_id in &agents {
            agent_steps.extend(self.factory.build_agent_steps(
                child,
                &step.experiment_id,
                agent_id,
                &step.id,
                step.sequence,
            )?);
        }
        self.steps.create_steps(&agent_steps).await?;

        tracing::info!(
            step_id = %step.id,
            experiment_id = %step.experiment_id,
            agents = agents.len(),
            agent_steps = agent_steps.len(),
            "spawned agent steps"
        );

        step.status = ExecutionStatus::InProgress;
        step.attempts += 1;
        step.last_modified = Utc::now();
        self.steps.update_step(step).await?;
        Ok(ExecutionStatus::InProgress)
    }

    async fn finish(
        &self,
        step: &mut ExperimentStepInstance,
        status: ExecutionStatus,
    ) -> Result<(), MonitorError> {
        let now = Utc::now();
        step.status = status;
        step.end_time = Some(now);
        step.last_modified = now;
        self.steps.update_step(step).await?;
        Ok(())
    }
}
