//! Built-in condition and action providers.
//!
//! Each provider is registered in the [`ProviderRegistry`](crate::ProviderRegistry)
//! under its `provider_type` key; conditions and actions in execution-goal
//! definitions select them by that key.

mod actions;
mod conditions;

pub use actions::{
    CreateExperimentAction, DisableTriggerAction, SelectEnvironmentAction, CLUSTER_ID_OUTPUT,
    EXPERIMENT_ID_OUTPUT, NODE_LIST_OUTPUT, SUBSCRIPTION_OUTPUT, VM_SKU_OUTPUT,
};
pub use conditions::{ExperimentHistoryCondition, TimerCondition};

use std::time::Duration;

use crate::errors::SchedulerError;
use crate::types::Parameters;

/// Read a required `Int` parameter.
pub(crate) fn required_int(
    params: &Parameters,
    key: &str,
    provider: &str,
) -> Result<i64, SchedulerError> {
    let value = params.get(key).ok_or_else(|| {
        SchedulerError::schema(format!("{provider}: missing required parameter '{key}'"))
    })?;
    value.as_int().ok_or_else(|| {
        SchedulerError::schema(format!(
            "{provider}: parameter '{key}' must be int, got {}",
            value.kind()
        ))
    })
}

/// Read an optional `Duration` (or `Int` seconds) parameter.
pub(crate) fn optional_duration(
    params: &Parameters,
    key: &str,
    provider: &str,
) -> Result<Option<Duration>, SchedulerError> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value.as_duration().map(Some).ok_or_else(|| {
            SchedulerError::schema(format!(
                "{provider}: parameter '{key}' must be a duration, got {}",
                value.kind()
            ))
        }),
    }
}

/// Read an optional `String` parameter.
pub(crate) fn optional_str<'a>(
    params: &'a Parameters,
    key: &str,
    provider: &str,
) -> Result<Option<&'a str>, SchedulerError> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some).ok_or_else(|| {
            SchedulerError::schema(format!(
                "{provider}: parameter '{key}' must be string, got {}",
                value.kind()
            ))
        }),
    }
}
