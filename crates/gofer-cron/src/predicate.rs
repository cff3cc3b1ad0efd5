//! Cron expressions as time predicates.
//!
//! Subscriptions use the five-field form `min hour dom month dow`, optionally
//! followed by a year. Expressions are canonicalised once, at subscribe time,
//! into the seconds-first form with the second pinned to `0`.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use cron::Schedule;
use gofer_core::{Error, Result};
use gofer_registry::TimePredicate;
use std::fmt;
use std::str::FromStr;

/// Name of the subscription parameter holding the expression.
pub const EXPRESSION_PARAM: &str = "expression";

/// A parsed cron expression.
#[derive(Clone)]
pub struct CronPredicate {
    expression: String,
    schedule: Schedule,
}

impl CronPredicate {
    pub fn parse(expression: &str) -> Result<Self> {
        let canonical = canonicalise(expression)?;
        let schedule = Schedule::from_str(&canonical).map_err(|e| invalid(format!(
            "could not parse '{}': {}",
            expression.trim(),
            e
        )))?;

        Ok(Self {
            expression: expression.split_whitespace().collect::<Vec<_>>().join(" "),
            schedule,
        })
    }

    /// The expression as the subscriber wrote it, whitespace-normalised.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Debug for CronPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronPredicate").field(&self.expression).finish()
    }
}

impl TimePredicate for CronPredicate {
    /// Membership test for the minute containing `at`.
    fn admits(&self, at: DateTime<Utc>) -> bool {
        self.schedule.includes(truncate_to_minute(at))
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::minutes(1)).unwrap_or(at)
}

fn canonicalise(expression: &str) -> Result<String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 | 6 => Ok(format!("0 {}", fields.join(" "))),
        n => Err(invalid(format!(
            "expected 5 fields (min hour dom month dow) or 6 with a year, got {}",
            n
        ))),
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidParameter {
        key: EXPRESSION_PARAM.to_string(),
        reason,
    }
}
