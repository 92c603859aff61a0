//! Triggers, execution goals, goals, conditions and actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::experiment::{ExecutionStatus, ExperimentComponent};
use super::parameters::Parameters;

/// Provider type of the reserved timer precondition.
///
/// A goal reached through a firing trigger has already satisfied its timer,
/// so the goal evaluator never invokes it.
pub const TIMER_CONDITION_TYPE: &str = "timer";

/// A recurrence rule that decides when a target goal may fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Trigger {
    pub id: String,
    pub execution_goal_id: String,
    /// Matches the name of one target goal in the execution goal.
    pub name: String,
    /// Cron expression (5, 6 or 7 fields).
    pub recurrence_expression: String,
    pub enabled: bool,
    pub team_name: String,
    #[serde(default)]
    pub version: u64,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// The experiment an execution goal creates when a target goal fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub workflow: Vec<ExperimentComponent>,
}

/// A bundle of control goals and target goals tied to one experiment template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionGoalDefinition {
    pub id: String,
    pub team_name: String,
    pub experiment_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub experiment_template: ExperimentTemplate,
    /// Values substituted into `$.parameters.<name>` references.
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub control_goals: Vec<Goal>,
    #[serde(default)]
    pub target_goals: Vec<Goal>,
}

fn default_true() -> bool {
    true
}

impl ExecutionGoalDefinition {
    /// The target goal fired by the given trigger name.
    pub fn target_goal(&self, trigger_name: &str) -> Option<&Goal> {
        self.target_goals.iter().find(|g| g.name == trigger_name)
    }
}

/// "If all preconditions hold, run all actions."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Goal {
    pub name: String,
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A parameterized predicate resolved against a registered condition provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Condition {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Condition {
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<super::ParameterValue>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A parameterized side effect resolved against a registered action provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Action {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Action {
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<super::ParameterValue>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one condition evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConditionResult {
    pub status: ExecutionStatus,
    pub satisfied: bool,
}

impl ConditionResult {
    pub fn satisfied(satisfied: bool) -> Self {
        Self {
            status: ExecutionStatus::Succeeded,
            satisfied,
        }
    }
}
