//! Provider registry: resolves condition and action providers by type name.
//!
//! The [`ProviderRegistry`] is populated at startup (the
//! [`SchedulerBuilder`](crate::SchedulerBuilder) registers the built-in
//! providers) and read concurrently by every coordination pass.
//!
//! # Example
//!
//! ```ignore
//! let registry = ProviderRegistry::new();
//! registry.register_condition(Arc::new(TimerCondition));
//! let provider = registry.condition("timer")?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::SchedulerError;
use crate::traits::{ActionProvider, ConditionProvider};

/// Thread-safe registry of condition and action providers.
///
/// Cheaply cloneable (inner state is `Arc`-wrapped). Multiple clones share
/// the same underlying registry.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    inner: Arc<RwLock<ProviderRegistryInner>>,
}

#[derive(Default)]
struct ProviderRegistryInner {
    conditions: BTreeMap<String, Arc<dyn ConditionProvider>>,
    actions: BTreeMap<String, Arc<dyn ActionProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a condition provider, replacing any with the same type.
    pub fn register_condition(&self, provider: Arc<dyn ConditionProvider>) {
        let mut inner = self.inner.write();
        inner
            .conditions
            .insert(provider.provider_type().to_string(), provider);
    }

    /// Register an action provider, replacing any with the same type.
    pub fn register_action(&self, provider: Arc<dyn ActionProvider>) {
        let mut inner = self.inner.write();
        inner
            .actions
            .insert(provider.provider_type().to_string(), provider);
    }

    pub fn condition(&self, provider_type: &str) -> Result<Arc<dyn ConditionProvider>, SchedulerError> {
        let inner = self.inner.read();
        inner
            .conditions
            .get(provider_type)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownProvider {
                provider_type: provider_type.to_string(),
            })
    }

    pub fn action(&self, provider_type: &str) -> Result<Arc<dyn ActionProvider>, SchedulerError> {
        let inner = self.inner.read();
        inner
            .actions
            .get(provider_type)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownProvider {
                provider_type: provider_type.to_string(),
            })
    }

    /// Registered condition types in sorted order.
    pub fn condition_types(&self) -> Vec<String> {
        self.inner.read().conditions.keys().cloned().collect()
    }

    /// Registered action types in sorted order.
    pub fn action_types(&self) -> Vec<String> {
        self.inner.read().actions.keys().cloned().collect()
    }
}
