//! Fixed agent directory.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::traits::AgentDirectory;
use crate::types::ExecutionTarget;

/// [`AgentDirectory`] returning the same agents for every experiment.
///
/// Useful for tests and single-environment deployments where the node and
/// VM agents are known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticAgentDirectory {
    agents: BTreeMap<ExecutionTarget, Vec<String>>,
}

impl StaticAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agents serving `target`, replacing any already set.
    pub fn with_agents(
        mut self,
        target: ExecutionTarget,
        agents: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.agents
            .insert(target, agents.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl AgentDirectory for StaticAgentDirectory {
    async fn agents_for(
        &self,
        _experiment_id: &str,
        target: ExecutionTarget,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.agents.get(&target).cloned().unwrap_or_default())
    }
}
