//! Built-in action providers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::required_int;
use crate::context::ScheduleContext;
use crate::errors::SchedulerError;
use crate::traits::{ActionProvider, EnvironmentReservation, ExperimentClient, TriggerStore};
use crate::types::*;

/// Output key holding the id of the experiment created in this pass.
pub const EXPERIMENT_ID_OUTPUT: &str = "experimentId";
/// Output key holding the comma-separated reserved node ids.
pub const NODE_LIST_OUTPUT: &str = "nodeList";
pub const SUBSCRIPTION_OUTPUT: &str = "subscription";
/// Output key holding the comma-separated VM SKUs of the first reserved node.
pub const VM_SKU_OUTPUT: &str = "vmSku";
pub const CLUSTER_ID_OUTPUT: &str = "clusterId";

const NODE_COUNT_PARAMETER: &str = "nodeCount";

// ---------------------------------------------------------------------------
// create_experiment
// ---------------------------------------------------------------------------

/// Submits the execution goal's experiment template.
///
/// Template parameters are overlaid first with the outputs published earlier
/// in the pass, then with the action's own (substituted) parameters.
pub struct CreateExperimentAction {
    client: Arc<dyn ExperimentClient>,
}

impl CreateExperimentAction {
    pub const PROVIDER_TYPE: &'static str = "create_experiment";

    pub fn new(client: Arc<dyn ExperimentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionProvider for CreateExperimentAction {
    fn provider_type(&self) -> &str {
        Self::PROVIDER_TYPE
    }

    async fn execute(
        &self,
        action: &Action,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        let params = ctx.resolve_parameters(&action.parameters)?;
        let goal = ctx.execution_goal();

        let mut template = goal.experiment_template.clone();
        if template.name.is_empty() {
            template.name = goal.experiment_name.clone();
        }
        template.parameters.extend(ctx.outputs());
        template.parameters.extend(params);

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        let instance = self.client.create_experiment(&template).await?;

        tracing::info!(
            trigger_id = %ctx.trigger().id,
            execution_goal_id = %goal.id,
            experiment_id = %instance.experiment_id,
            experiment_name = %instance.experiment_name,
            "experiment created"
        );

        ctx.publish_output(EXPERIMENT_ID_OUTPUT, instance.experiment_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// select_environment
// ---------------------------------------------------------------------------

/// Reserves `nodeCount` nodes and publishes their identity for later actions.
///
/// Every other parameter is passed to the reservation service as a filter.
pub struct SelectEnvironmentAction {
    reservation: Arc<dyn EnvironmentReservation>,
}

impl SelectEnvironmentAction {
    pub const PROVIDER_TYPE: &'static str = "select_environment";

    pub fn new(reservation: Arc<dyn EnvironmentReservation>) -> Self {
        Self { reservation }
    }
}

#[async_trait]
impl ActionProvider for SelectEnvironmentAction {
    fn provider_type(&self) -> &str {
        Self::PROVIDER_TYPE
    }

    async fn execute(
        &self,
        action: &Action,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        let mut filters = ctx.resolve_parameters(&action.parameters)?;
        let node_count = required_int(&filters, NODE_COUNT_PARAMETER, Self::PROVIDER_TYPE)?;
        let node_count = u32::try_from(node_count)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                SchedulerError::schema(format!(
                    "{}: parameter '{NODE_COUNT_PARAMETER}' must be at least 1, got {node_count}",
                    Self::PROVIDER_TYPE
                ))
            })?;
        filters.remove(NODE_COUNT_PARAMETER);

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        let query = EnvironmentQuery {
            node_count,
            filters,
        };
        let candidates = self.reservation.reserve_candidates(&query).await?;
        if candidates.len() < node_count as usize {
            return Err(SchedulerError::EnvironmentUnavailable {
                requested: node_count,
                reserved: candidates.len(),
            });
        }
        let candidates = &candidates[..node_count as usize];
        let first = &candidates[0];

        let node_list = candidates
            .iter()
            .map(|c| c.node_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        tracing::info!(
            trigger_id = %ctx.trigger().id,
            execution_goal_id = %ctx.execution_goal().id,
            node_list = %node_list,
            cluster_id = %first.cluster_id,
            "environment selected"
        );

        ctx.publish_output(NODE_LIST_OUTPUT, node_list);
        ctx.publish_output(SUBSCRIPTION_OUTPUT, first.subscription.clone());
        ctx.publish_output(VM_SKU_OUTPUT, first.vm_sku.join(","));
        ctx.publish_output(CLUSTER_ID_OUTPUT, first.cluster_id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// disable_trigger
// ---------------------------------------------------------------------------

/// Disables the firing trigger, typically once a target count was reached.
pub struct DisableTriggerAction {
    triggers: Arc<dyn TriggerStore>,
}

impl DisableTriggerAction {
    pub const PROVIDER_TYPE: &'static str = "disable_trigger";

    pub fn new(triggers: Arc<dyn TriggerStore>) -> Self {
        Self { triggers }
    }
}

#[async_trait]
impl ActionProvider for DisableTriggerAction {
    fn provider_type(&self) -> &str {
        Self::PROVIDER_TYPE
    }

    async fn execute(
        &self,
        _action: &Action,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        let mut trigger = ctx.trigger().clone();
        trigger.enabled = false;
        trigger.version += 1;
        trigger.last_modified = Utc::now();
        self.triggers.update_trigger(&trigger).await?;

        tracing::info!(
            trigger_id = %trigger.id,
            execution_goal_id = %trigger.execution_goal_id,
            version = trigger.version,
            "trigger disabled"
        );
        Ok(())
    }
}
