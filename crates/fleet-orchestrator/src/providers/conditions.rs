//! Built-in condition providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{optional_duration, optional_str, required_int};
use crate::context::ScheduleContext;
use crate::errors::SchedulerError;
use crate::traits::{ConditionProvider, ExperimentHistory};
use crate::types::*;

/// The reserved `timer` condition.
///
/// The goal evaluator skips it, because a goal only runs after its trigger
/// fired. Evaluating it directly is always satisfied.
pub struct TimerCondition;

#[async_trait]
impl ConditionProvider for TimerCondition {
    fn provider_type(&self) -> &str {
        TIMER_CONDITION_TYPE
    }

    async fn evaluate(
        &self,
        _condition: &Condition,
        _ctx: &ScheduleContext,
        _cancel: &CancellationToken,
    ) -> Result<ConditionResult, SchedulerError> {
        Ok(ConditionResult::satisfied(true))
    }
}

const DEFAULT_TIME_RANGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Compares a count of past experiments against a threshold parameter.
///
/// Satisfied when the count is at least the threshold. The experiment name
/// defaults to the execution goal's and can be overridden with an
/// `experimentName` parameter; windowed variants only count experiments
/// created within `timeRange` (default one day) of the tick.
pub struct ExperimentHistoryCondition {
    provider_type: &'static str,
    outcome: ExperimentOutcome,
    threshold_parameter: &'static str,
    windowed: bool,
    history: Arc<dyn ExperimentHistory>,
}

impl ExperimentHistoryCondition {
    /// `failed_experiments`: circuit breaker on recent failures
    /// (`maxFailures`).
    pub fn failed_experiments(history: Arc<dyn ExperimentHistory>) -> Self {
        Self {
            provider_type: "failed_experiments",
            outcome: ExperimentOutcome::Failed,
            threshold_parameter: "maxFailures",
            windowed: true,
            history,
        }
    }

    /// `successful_experiments`: goal reached once enough experiments
    /// succeeded (`targetExperimentCount`).
    pub fn successful_experiments(history: Arc<dyn ExperimentHistory>) -> Self {
        Self {
            provider_type: "successful_experiments",
            outcome: ExperimentOutcome::Succeeded,
            threshold_parameter: "targetExperimentCount",
            windowed: true,
            history,
        }
    }

    /// `in_progress_experiments`: concurrency cap
    /// (`maxConcurrentExperiments`).
    pub fn in_progress_experiments(history: Arc<dyn ExperimentHistory>) -> Self {
        Self {
            provider_type: "in_progress_experiments",
            outcome: ExperimentOutcome::InProgress,
            threshold_parameter: "maxConcurrentExperiments",
            windowed: false,
            history,
        }
    }
}

#[async_trait]
impl ConditionProvider for ExperimentHistoryCondition {
    fn provider_type(&self) -> &str {
        self.provider_type
    }

    async fn evaluate(
        &self,
        condition: &Condition,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<ConditionResult, SchedulerError> {
        let params = ctx.resolve_parameters(&condition.parameters)?;
        let threshold = required_int(&params, self.threshold_parameter, self.provider_type)?;
        if threshold < 0 {
            return Err(SchedulerError::schema(format!(
                "{}: parameter '{}' must not be negative",
                self.provider_type, self.threshold_parameter
            )));
        }

        let since = if self.windowed {
            let range = optional_duration(&params, "timeRange", self.provider_type)?
                .unwrap_or(DEFAULT_TIME_RANGE);
            let range = chrono::Duration::from_std(range).map_err(|e| {
                SchedulerError::schema(format!("{}: timeRange: {e}", self.provider_type))
            })?;
            Some(ctx.now() - range)
        } else {
            None
        };

        let goal = ctx.execution_goal();
        let experiment_name = optional_str(&params, "experimentName", self.provider_type)?
            .unwrap_or(&goal.experiment_name)
            .to_string();

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        let query = ExperimentQuery {
            experiment_name,
            team_name: goal.team_name.clone(),
            outcome: self.outcome,
            since,
        };
        let count = self.history.count_experiments(&query).await?;
        let satisfied = count >= threshold as u64;

        tracing::debug!(
            provider_type = self.provider_type,
            execution_goal_id = %goal.id,
            count,
            threshold,
            satisfied,
            "evaluated experiment history condition"
        );

        Ok(ConditionResult::satisfied(satisfied))
    }
}
