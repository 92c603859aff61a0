//! Per-pass schedule context handed to condition and action providers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::errors::SchedulerError;
use crate::types::{ExecutionGoalDefinition, ParameterValue, Parameters, Trigger};

/// Prefix of a string parameter that references a goal-level parameter.
pub const PARAMETER_REFERENCE_PREFIX: &str = "$.parameters.";

/// Everything one coordination pass needs: the resolved execution goal, the
/// firing trigger and the ambient configuration.
///
/// Created fresh for each candidate trigger and dropped when its
/// coordination finishes. The only mutable part is the output bag that lets
/// an action publish values for later actions of the same goal; use
/// [`goal_scope`](Self::goal_scope) to give each goal its own bag.
#[derive(Debug)]
pub struct ScheduleContext {
    execution_goal: Arc<ExecutionGoalDefinition>,
    trigger: Trigger,
    config: Arc<SchedulerConfig>,
    now: DateTime<Utc>,
    outputs: Mutex<Parameters>,
}

impl ScheduleContext {
    pub fn new(
        execution_goal: Arc<ExecutionGoalDefinition>,
        trigger: Trigger,
        config: Arc<SchedulerConfig>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_goal,
            trigger,
            config,
            now,
            outputs: Mutex::new(Parameters::new()),
        }
    }

    /// A context for evaluating one goal: same goal, trigger, configuration
    /// and tick, with an empty output bag.
    pub fn goal_scope(&self) -> Self {
        Self::new(
            Arc::clone(&self.execution_goal),
            self.trigger.clone(),
            Arc::clone(&self.config),
            self.now,
        )
    }

    pub fn execution_goal(&self) -> &ExecutionGoalDefinition {
        &self.execution_goal
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The tick time this pass was started for.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Substitute `$.parameters.<name>` references with the execution goal's
    /// parameter values. Unreferenced values pass through unchanged.
    pub fn resolve_parameters(&self, parameters: &Parameters) -> Result<Parameters, SchedulerError> {
        parameters
            .iter()
            .map(|(key, value)| -> Result<_, SchedulerError> {
                Ok((key.clone(), self.resolve_value(key, value)?))
            })
            .collect()
    }

    fn resolve_value(
        &self,
        key: &str,
        value: &ParameterValue,
    ) -> Result<ParameterValue, SchedulerError> {
        let Some(reference) = value
            .as_str()
            .and_then(|s| s.strip_prefix(PARAMETER_REFERENCE_PREFIX))
        else {
            return Ok(value.clone());
        };

        self.execution_goal
            .parameters
            .get(reference)
            .cloned()
            .ok_or_else(|| {
                SchedulerError::schema(format!(
                    "parameter '{key}' references undefined goal parameter '{reference}'"
                ))
            })
    }

    /// Publish a value for actions that run later in the same goal.
    pub fn publish_output(&self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.outputs.lock().insert(key.into(), value.into());
    }

    pub fn output(&self, key: &str) -> Option<ParameterValue> {
        self.outputs.lock().get(key).cloned()
    }

    pub fn outputs(&self) -> Parameters {
        self.outputs.lock().clone()
    }
}
