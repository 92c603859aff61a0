//! Trigger candidate selection.
//!
//! A trigger is a candidate for a tick when the next occurrence of its
//! recurrence expression at or after `now - grace` falls before
//! `now + grace`. The window is half-open, so ticks spaced exactly
//! `2 * grace` apart tile time and fire each occurrence once.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use cron::Schedule;

use crate::errors::SchedulerError;
use crate::types::Trigger;

/// Convert a 5-field cron expression to the 7-field format the `cron` crate
/// expects. 6- and 7-field expressions already carry seconds and pass
/// through.
///
/// Standard cron: `min hour day month weekday`
/// Cron crate:    `sec min hour day month weekday [year]`
fn normalize_cron_expression(expr: &str) -> String {
    match expr.split_whitespace().count() {
        5 => format!("0 {} *", expr.trim()),
        _ => expr.trim().to_string(),
    }
}

/// Parse a trigger recurrence expression.
pub fn parse_recurrence(expression: &str) -> Result<Schedule, SchedulerError> {
    normalize_cron_expression(expression)
        .parse::<Schedule>()
        .map_err(|e| SchedulerError::Recurrence {
            expression: expression.to_string(),
            message: e.to_string(),
        })
}

/// Whether `schedule` has an occurrence inside `[now - grace, now + grace)`.
///
/// A window that cannot be represented is never due.
pub fn is_due(schedule: &Schedule, now: DateTime<Utc>, grace: Duration) -> bool {
    let Ok(grace) = TimeDelta::from_std(grace) else {
        return false;
    };
    let (Some(start), Some(end)) = (now.checked_sub_signed(grace), now.checked_add_signed(grace))
    else {
        return false;
    };

    // `after` is exclusive and truncates to whole seconds; step back one
    // second and drop anything before the window.
    schedule
        .after(&(start - TimeDelta::seconds(1)))
        .find(|t| *t >= start)
        .is_some_and(|next| next < end)
}

/// Select the triggers that fire for the tick at `now`.
///
/// Disabled triggers never fire. A trigger whose expression does not parse
/// is logged and excluded without affecting the others. The result depends
/// only on the arguments, so calling it twice with the same input yields the
/// same candidates.
pub fn select_candidates(triggers: &[Trigger], now: DateTime<Utc>, grace: Duration) -> Vec<Trigger> {
    triggers
        .iter()
        .filter(|trigger| trigger.enabled)
        .filter(|trigger| match parse_recurrence(&trigger.recurrence_expression) {
            Ok(schedule) => is_due(&schedule, now, grace),
            Err(e) => {
                tracing::warn!(
                    trigger_id = %trigger.id,
                    execution_goal_id = %trigger.execution_goal_id,
                    "excluding trigger with malformed recurrence: {e}"
                );
                false
            }
        })
        .cloned()
        .collect()
}
