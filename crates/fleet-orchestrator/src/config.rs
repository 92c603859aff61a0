//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ambient configuration shared read-only by every coordination pass.
///
/// Durations deserialize from `{"secs": .., "nanos": ..}`; every field has a
/// default so a partial document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SchedulerConfig {
    /// Name of the environment this scheduler runs in (e.g. "production").
    pub environment: String,
    /// Half-width of the window around "now" in which a trigger fires.
    /// Default: 10s.
    pub grace_window: Duration,
    /// Interval between scheduling passes when driven by [`SchedulerHost`](crate::SchedulerHost).
    /// Must not exceed `2 * grace_window`, or occurrences between windows
    /// are missed. Default: 20s.
    pub tick_interval: Duration,
    /// Monitoring timeout when a component has no `timeout` parameter.
    /// Default: 1h.
    pub monitor_timeout: Duration,
    /// Interval between monitoring polls. Default: 30s.
    pub monitor_poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            environment: "default".into(),
            grace_window: Duration::from_secs(10),
            tick_interval: Duration::from_secs(20),
            monitor_timeout: Duration::from_secs(60 * 60),
            monitor_poll_interval: Duration::from_secs(30),
        }
    }
}

impl SchedulerConfig {
    /// Whether consecutive passes `tick_interval` apart leave no gap between
    /// their firing windows.
    pub fn ticks_cover_every_occurrence(&self) -> bool {
        self.grace_window
            .checked_mul(2)
            .map_or(true, |span| self.tick_interval <= span)
    }
}
