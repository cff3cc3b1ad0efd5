//! Cron extension settings read from the system config extras.

use gofer_extension::SystemConfig;
use gofer_extension::config::{ConfigError, Diagnostic};
use std::time::Duration;

const KEY_TICK_INTERVAL: &str = "CRON_TICK_INTERVAL_SECS";

/// Shortest allowed scan interval; finer resolution than a minute is meaningless.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct CronConfig {
    pub tick_interval: Duration,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            tick_interval: MIN_TICK_INTERVAL,
        }
    }
}

impl CronConfig {
    pub fn from_system(config: &SystemConfig) -> Result<Self, ConfigError> {
        let Some(raw) = config.extra(KEY_TICK_INTERVAL) else {
            return Ok(Self::default());
        };

        let secs: u64 = raw
            .trim()
            .parse()
            .map_err(|_| invalid(format!("expected whole seconds, got '{}'", raw)))?;
        let tick_interval = Duration::from_secs(secs);
        if tick_interval < MIN_TICK_INTERVAL {
            return Err(invalid(format!(
                "must be at least {} seconds",
                MIN_TICK_INTERVAL.as_secs()
            )));
        }

        Ok(Self { tick_interval })
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(vec![Diagnostic {
        key: KEY_TICK_INTERVAL.to_string(),
        message,
    }])
}
