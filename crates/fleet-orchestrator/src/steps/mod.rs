//! Experiment step construction and monitoring.

pub mod factory;
pub mod monitor;

pub use factory::{
    monitor_provider_for, monitoring_component, StepFactory, DIAGNOSTICS_COMPONENT_TYPE,
    SEQUENCE_STRIDE,
};
pub use monitor::{aggregate_status, MonitorRuntime, TIMEOUT_PARAMETER};
