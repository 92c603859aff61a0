//! In-memory experiment step store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::traits::StepStore;
use crate::types::ExperimentStepInstance;

/// In-memory implementation of [`StepStore`].
#[derive(Clone, Default)]
pub struct InMemoryStepStore {
    steps: Arc<RwLock<BTreeMap<String, ExperimentStepInstance>>>,
}

impl InMemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored step, ordered by sequence then id.
    pub async fn all(&self) -> Vec<ExperimentStepInstance> {
        let mut steps: Vec<_> = self.steps.read().await.values().cloned().collect();
        steps.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
        steps
    }
}

#[async_trait]
impl StepStore for InMemoryStepStore {
    async fn create_steps(&self, steps: &[ExperimentStepInstance]) -> Result<(), StoreError> {
        let mut stored = self.steps.write().await;
        if let Some(dup) = steps.iter().find(|s| stored.contains_key(&s.id)) {
            return Err(StoreError::Store {
                message: format!("step '{}' already exists", dup.id),
            });
        }
        for step in steps {
            stored.insert(step.id.clone(), step.clone());
        }
        Ok(())
    }

    async fn get_step(&self, step_id: &str) -> Result<ExperimentStepInstance, StoreError> {
        self.steps
            .read()
            .await
            .get(step_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                id: step_id.to_string(),
            })
    }

    async fn update_step(&self, step: &ExperimentStepInstance) -> Result<(), StoreError> {
        let mut stored = self.steps.write().await;
        match stored.get_mut(&step.id) {
            Some(existing) => {
                *existing = step.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                id: step.id.clone(),
            }),
        }
    }

    async fn list_child_steps(
        &self,
        parent_step_id: &str,
    ) -> Result<Vec<ExperimentStepInstance>, StoreError> {
        let mut children: Vec<_> = self
            .steps
            .read()
            .await
            .values()
            .filter(|s| s.parent_step_id.as_deref() == Some(parent_step_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }
}
