//! Experiment components, step instances and environment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parameters::Parameters;

/// Group name targeting every group of an experiment.
pub const ALL_GROUPS: &str = "*";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    InProgressContinue,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// `Succeeded`, `Failed` and `Cancelled` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Component declarations
// ---------------------------------------------------------------------------

/// The role a component plays in an experiment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    EnvironmentCriteria,
    EnvironmentSetup,
    EnvironmentCleanup,
    Payload,
    Certification,
    Workload,
    Watchdog,
    Diagnostics,
}

impl StepType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnvironmentCriteria => "environment_criteria",
            Self::EnvironmentSetup => "environment_setup",
            Self::EnvironmentCleanup => "environment_cleanup",
            Self::Payload => "payload",
            Self::Certification => "certification",
            Self::Workload => "workload",
            Self::Watchdog => "watchdog",
            Self::Diagnostics => "diagnostics",
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a component's body runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTarget {
    /// Inside the orchestrator itself.
    #[default]
    ExecuteRemotely,
    /// Inside the agent on a physical node.
    ExecuteOnNode,
    /// Inside the agent on a virtual machine.
    ExecuteOnVirtualMachine,
}

/// A node in the declarative workflow tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub step_type: StepType,
    #[serde(default)]
    pub target: ExecutionTarget,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub tags: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ExperimentComponent>,
    /// Children run concurrently under one sequence number.
    #[serde(default)]
    pub parallel: bool,
}

impl ExperimentComponent {
    pub fn new(
        component_type: impl Into<String>,
        name: impl Into<String>,
        step_type: StepType,
    ) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
            description: None,
            group: None,
            step_type,
            target: ExecutionTarget::ExecuteRemotely,
            parameters: Parameters::new(),
            tags: Parameters::new(),
            components: Vec::new(),
            parallel: false,
        }
    }

    /// A parallel group whose children share one sequence number.
    pub fn parallel_group(name: impl Into<String>, children: Vec<ExperimentComponent>) -> Self {
        let step_type = children
            .first()
            .map(|c| c.step_type)
            .unwrap_or(StepType::Workload);
        Self {
            components: children,
            parallel: true,
            ..Self::new("parallel_execution", name, step_type)
        }
    }

    pub fn with_target(mut self, target: ExecutionTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
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

// ---------------------------------------------------------------------------
// Step instances
// ---------------------------------------------------------------------------

/// The runtime-tracked, sequenced realization of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentStepInstance {
    pub id: String,
    pub experiment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub step_type: StepType,
    pub status: ExecutionStatus,
    pub sequence: u32,
    pub attempts: u32,
    pub definition: ExperimentComponent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Experiments and environments
// ---------------------------------------------------------------------------

/// Identity of an experiment returned by the submission service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentInstance {
    pub experiment_id: String,
    pub experiment_name: String,
}

/// A reserved node an experiment can run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EnvironmentCandidate {
    pub node_id: String,
    pub subscription: String,
    #[serde(default)]
    pub vm_sku: Vec<String>,
    pub cluster_id: String,
}

/// Request sent to the environment reservation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EnvironmentQuery {
    pub node_count: u32,
    /// Provider-specific filters passed through verbatim.
    #[serde(default)]
    pub filters: Parameters,
}

/// Outcome filter for experiment history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentOutcome {
    Succeeded,
    Failed,
    InProgress,
}

/// Query sent to the experiment history collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentQuery {
    pub experiment_name: String,
    pub team_name: String,
    pub outcome: ExperimentOutcome,
    /// Only experiments created at or after this instant count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}
