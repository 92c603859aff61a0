//! Step factory: flattens experiment components into sequenced step instances.
//!
//! Every top-level component of a workflow gets its own sequence number,
//! [`SEQUENCE_STRIDE`] apart. A parallel group is expanded into its children,
//! which all share the group's sequence number and therefore run
//! concurrently.
//!
//! Orchestration steps whose component targets a node or virtual machine are
//! wrapped in a monitoring component (see [`monitoring_component`]); the
//! monitor later spawns the agent steps built by
//! [`StepFactory::build_agent_steps`].

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::errors::StepFactoryError;
use crate::types::*;

/// Distance between the sequence numbers of consecutive top-level components.
pub const SEQUENCE_STRIDE: u32 = 100;

/// Provider type of the opt-in diagnostics step appended to a workflow.
pub const DIAGNOSTICS_COMPONENT_TYPE: &str = "auto_triage_diagnostics";

/// The monitoring provider type for a step type, if it has one.
pub fn monitor_provider_for(step_type: StepType) -> Option<&'static str> {
    match step_type {
        StepType::EnvironmentSetup => Some("environment_setup_monitor"),
        StepType::EnvironmentCleanup => Some("environment_cleanup_monitor"),
        StepType::Payload => Some("payload_monitor"),
        StepType::Certification => Some("certification_monitor"),
        StepType::Workload => Some("workload_monitor"),
        StepType::Watchdog => Some("watchdog_monitor"),
        StepType::EnvironmentCriteria | StepType::Diagnostics => None,
    }
}

/// Build the orchestrator-resident monitor for a remotely-targeted component.
///
/// The wrapper copies the original's name, group, parameters and tags, and
/// holds the original, unchanged, as its single child.
pub fn monitoring_component(
    component: &ExperimentComponent,
) -> Result<ExperimentComponent, StepFactoryError> {
    let provider = monitor_provider_for(component.step_type).ok_or_else(|| {
        StepFactoryError::UnmappedStepType {
            component: component.name.clone(),
            step_type: component.step_type.to_string(),
        }
    })?;

    Ok(ExperimentComponent {
        component_type: provider.to_string(),
        name: component.name.clone(),
        description: component.description.clone(),
        group: component.group.clone(),
        step_type: component.step_type,
        target: ExecutionTarget::ExecuteRemotely,
        parameters: component.parameters.clone(),
        tags: component.tags.clone(),
        components: vec![component.clone()],
        parallel: false,
    })
}

type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Builds [`ExperimentStepInstance`]s from experiment components.
///
/// Pure apart from id generation and timestamps; stub the id generator with
/// [`with_id_generator`](Self::with_id_generator) for deterministic output.
#[derive(Clone)]
pub struct StepFactory {
    id_generator: IdGenerator,
}

impl Default for StepFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StepFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepFactory").finish_non_exhaustive()
    }
}

impl StepFactory {
    /// A factory issuing random UUID v4 step ids.
    pub fn new() -> Self {
        Self {
            id_generator: Arc::new(|| Uuid::new_v4().to_string()),
        }
    }

    pub fn with_id_generator(generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            id_generator: Arc::new(generator),
        }
    }

    /// Build orchestration steps for a whole workflow.
    ///
    /// The i-th component gets sequence `start_sequence + (i + 1) * 100`.
    /// With `enable_diagnostics`, one auto-triage diagnostics step targeting
    /// all groups is appended after every other step.
    pub fn build_workflow_steps(
        &self,
        workflow: &[ExperimentComponent],
        experiment_id: &str,
        start_sequence: u32,
        enable_diagnostics: bool,
    ) -> Result<Vec<ExperimentStepInstance>, StepFactoryError> {
        let mut steps = Vec::new();
        let mut sequence = start_sequence;

        for component in workflow {
            sequence = next_sequence(sequence, &component.name)?;
            steps.extend(self.build_orchestration_steps(component, experiment_id, sequence)?);
        }

        if enable_diagnostics {
            sequence = next_sequence(sequence, DIAGNOSTICS_COMPONENT_TYPE)?;
            let diagnostics = ExperimentComponent::new(
                DIAGNOSTICS_COMPONENT_TYPE,
                "Auto-triage diagnostics",
                StepType::Diagnostics,
            )
            .with_group(ALL_GROUPS);
            steps.push(self.new_step(diagnostics, experiment_id, sequence, None, None));
        }

        Ok(steps)
    }

    /// Build orchestrator-resident steps for one top-level component.
    ///
    /// `ExecuteRemotely` components are emitted as-is. Node and VM targets
    /// are emitted as monitoring steps wrapping the original component.
    pub fn build_orchestration_steps(
        &self,
        component: &ExperimentComponent,
        experiment_id: &str,
        sequence: u32,
    ) -> Result<Vec<ExperimentStepInstance>, StepFactoryError> {
        components_in_sequence(component)?
            .into_iter()
            .map(|c| -> Result<_, StepFactoryError> {
                let definition = match c.target {
                    ExecutionTarget::ExecuteRemotely => c.clone(),
                    ExecutionTarget::ExecuteOnNode | ExecutionTarget::ExecuteOnVirtualMachine => {
                        monitoring_component(c)?
                    }
                };
                Ok(self.new_step(definition, experiment_id, sequence, None, None))
            })
            .collect()
    }

    /// Build the steps an agent runs for one component.
    ///
    /// Agent steps never run in the orchestrator, so an `ExecuteRemotely`
    /// component is a schema error.
    pub fn build_agent_steps(
        &self,
        component: &ExperimentComponent,
        experiment_id: &str,
        agent_id: &str,
        parent_step_id: &str,
        sequence: u32,
    ) -> Result<Vec<ExperimentStepInstance>, StepFactoryError> {
        components_in_sequence(component)?
            .into_iter()
            .map(|c| -> Result<_, StepFactoryError> {
                if c.target == ExecutionTarget::ExecuteRemotely {
                    return Err(StepFactoryError::Schema {
                        component: c.name.clone(),
                        message: "agent steps cannot target execute_remotely".into(),
                    });
                }
                Ok(self.new_step(
                    c.clone(),
                    experiment_id,
                    sequence,
                    Some(agent_id.to_string()),
                    Some(parent_step_id.to_string()),
                ))
            })
            .collect()
    }

    fn new_step(
        &self,
        definition: ExperimentComponent,
        experiment_id: &str,
        sequence: u32,
        agent_id: Option<String>,
        parent_step_id: Option<String>,
    ) -> ExperimentStepInstance {
        let now = Utc::now();
        ExperimentStepInstance {
            id: (self.id_generator)(),
            experiment_id: experiment_id.to_string(),
            group: definition.group.clone(),
            step_type: definition.step_type,
            status: ExecutionStatus::Pending,
            sequence,
            attempts: 0,
            definition,
            agent_id,
            parent_step_id,
            start_time: None,
            end_time: None,
            created: now,
            last_modified: now,
        }
    }
}

/// A parallel group expands to its children; anything else is itself.
fn next_sequence(sequence: u32, component: &str) -> Result<u32, StepFactoryError> {
    sequence
        .checked_add(SEQUENCE_STRIDE)
        .ok_or_else(|| StepFactoryError::Schema {
            component: component.to_string(),
            message: format!("sequence {sequence} leaves no room for another step"),
        })
}

fn components_in_sequence(
    component: &ExperimentComponent,
) -> Result<Vec<&ExperimentComponent>, StepFactoryError> {
    if !component.parallel {
        validate(component)?;
        return Ok(vec![component]);
    }

    if component.components.is_empty() {
        return Err(StepFactoryError::Schema {
            component: component.name.clone(),
            message: "parallel group has no components".into(),
        });
    }

    component
        .components
        .iter()
        .map(|child| -> Result<_, StepFactoryError> {
            if child.parallel {
                return Err(StepFactoryError::Schema {
                    component: child.name.clone(),
                    message: "parallel groups cannot be nested".into(),
                });
            }
            validate(child)?;
            Ok(child)
        })
        .collect()
}

fn validate(component: &ExperimentComponent) -> Result<(), StepFactoryError> {
    if component.name.trim().is_empty() {
        return Err(StepFactoryError::Schema {
            component: component.component_type.clone(),
            message: "component name is empty".into(),
        });
    }
    if component.component_type.trim().is_empty() {
        return Err(StepFactoryError::Schema {
            component: component.name.clone(),
            message: "component type is empty".into(),
        });
    }
    Ok(())
}
