//! Engine configuration, taken from the environment with sane defaults.
use std::{env, time::Duration};

use log::*;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_REMINDER_AFTER_HOURS: i64 = 72;
pub const DEFAULT_CANCEL_AFTER_HOURS: i64 = 96;

/// Timing knobs for the stalled-order sweep.
///
/// `cancel_after` should be strictly greater than `reminder_after`, so that every order gets its
/// nudge and a grace window before cancellation.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often the background worker wakes up.
    pub interval: Duration,
    /// How long an order may sit untouched before the buyer is reminded.
    pub reminder_after: chrono::Duration,
    /// How long an already-reminded order may sit untouched before it is cancelled.
    pub cancel_after: chrono::Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            reminder_after: chrono::Duration::hours(DEFAULT_REMINDER_AFTER_HOURS),
            cancel_after: chrono::Duration::hours(DEFAULT_CANCEL_AFTER_HOURS),
        }
    }
}

impl SweepConfig {
    /// Reads `BBE_SWEEP_INTERVAL_SECS`, `BBE_REMINDER_AFTER_HOURS` and `BBE_CANCEL_AFTER_HOURS`
    /// from the environment, falling back to the defaults for anything missing or malformed.
    pub fn from_env_or_default() -> Self {
        let interval_secs = env_val("BBE_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);
        let reminder_hours = env_val("BBE_REMINDER_AFTER_HOURS", DEFAULT_REMINDER_AFTER_HOURS);
        let cancel_hours = env_val("BBE_CANCEL_AFTER_HOURS", DEFAULT_CANCEL_AFTER_HOURS);
        if cancel_hours <= reminder_hours {
            warn!(
                "🪛️ BBE_CANCEL_AFTER_HOURS ({cancel_hours}) should be greater than BBE_REMINDER_AFTER_HOURS \
                 ({reminder_hours}). Stalled orders may be cancelled on the same pass that reminds them."
            );
        }
        Self {
            interval: Duration::from_secs(interval_secs),
            reminder_after: chrono::Duration::hours(reminder_hours),
            cancel_after: chrono::Duration::hours(cancel_hours),
        }
    }
}

fn env_val<T: std::str::FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(s) => s.parse().unwrap_or_else(|_| {
            warn!("🪛️ {var} is set but could not be parsed. Using the default.");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_leave_a_grace_window() {
        let config = SweepConfig::default();
        assert!(config.cancel_after > config.reminder_after);
        assert_eq!(config.interval, Duration::from_secs(3600));
    }
}
