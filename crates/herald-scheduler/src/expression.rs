use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{Result, SchedulerError};

/// Parse a job's cron expression into a [`Schedule`].
///
/// The `cron` crate expects a leading seconds field; classic five-field
/// expressions are accepted by prepending `0` so they fire at second zero.
pub fn parse(expression: &str) -> Result<Schedule> {
    let normalized = normalize(expression);
    Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

fn normalize(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// The next fire time strictly after `now`, `None` when the schedule has no
/// future occurrence.
pub fn next_fire(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&now).next()
}
