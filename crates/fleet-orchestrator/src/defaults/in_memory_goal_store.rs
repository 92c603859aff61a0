//! In-memory execution-goal store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::traits::ExecutionGoalStore;
use crate::types::ExecutionGoalDefinition;

/// In-memory implementation of [`ExecutionGoalStore`], keyed by
/// `(execution_goal_id, team_name)`.
#[derive(Clone, Default)]
pub struct InMemoryExecutionGoalStore {
    goals: Arc<RwLock<BTreeMap<(String, String), ExecutionGoalDefinition>>>,
}

impl InMemoryExecutionGoalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_goals(goals: impl IntoIterator<Item = ExecutionGoalDefinition>) -> Self {
        let map = goals
            .into_iter()
            .map(|g| ((g.id.clone(), g.team_name.clone()), g))
            .collect();
        Self {
            goals: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace a definition.
    pub async fn insert(&self, goal: ExecutionGoalDefinition) {
        self.goals
            .write()
            .await
            .insert((goal.id.clone(), goal.team_name.clone()), goal);
    }
}

#[async_trait]
impl ExecutionGoalStore for InMemoryExecutionGoalStore {
    async fn get_execution_goal(
        &self,
        execution_goal_id: &str,
        team_name: &str,
    ) -> Result<ExecutionGoalDefinition, StoreError> {
        self.goals
            .read()
            .await
            .get(&(execution_goal_id.to_string(), team_name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                id: format!("{team_name}/{execution_goal_id}"),
            })
    }
}
