//! In-memory trigger store for testing and lightweight usage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::traits::TriggerStore;
use crate::types::Trigger;

/// In-memory implementation of [`TriggerStore`].
///
/// Keyed by trigger id in a `BTreeMap` so listings are deterministic.
#[derive(Clone, Default)]
pub struct InMemoryTriggerStore {
    triggers: Arc<RwLock<BTreeMap<String, Trigger>>>,
}

impl InMemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_triggers(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        let map = triggers.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            triggers: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace a trigger.
    pub async fn insert(&self, trigger: Trigger) {
        self.triggers
            .write()
            .await
            .insert(trigger.id.clone(), trigger);
    }

    pub async fn get(&self, id: &str) -> Option<Trigger> {
        self.triggers.read().await.get(id).cloned()
    }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn list_enabled_triggers(&self) -> Result<Vec<Trigger>, StoreError> {
        Ok(self
            .triggers
            .read()
            .await
            .values()
            .filter(|t| t.enabled)
            .cloned()
            .collect())
    }

    async fn update_trigger(&self, trigger: &Trigger) -> Result<(), StoreError> {
        let mut triggers = self.triggers.write().await;
        match triggers.get_mut(&trigger.id) {
            Some(stored) => {
                *stored = trigger.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                id: trigger.id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::trigger;

    #[tokio::test]
    async fn test_lists_only_enabled() {
        let mut disabled = trigger("weekly", "0 0 * * 0");
        disabled.enabled = false;
        let store = InMemoryTriggerStore::with_triggers(vec![trigger("daily", "0 0 * * *"), disabled]);

        let enabled = store.list_enabled_triggers().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "daily");
    }

    #[tokio::test]
    async fn test_update_unknown_trigger() {
        let store = InMemoryTriggerStore::new();
        let err = store
            .update_trigger(&trigger("daily", "0 0 * * *"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_replaces() {
        let store = InMemoryTriggerStore::with_triggers(vec![trigger("daily", "0 0 * * *")]);
        let mut updated = store.get("trigger-daily").await.unwrap();
        updated.enabled = false;

        store.update_trigger(&updated).await.unwrap();
        assert!(store.list_enabled_triggers().await.unwrap().is_empty());
        assert!(!store.get("trigger-daily").await.unwrap().enabled);
    }
}
