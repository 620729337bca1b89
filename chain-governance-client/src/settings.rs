use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings document")]
    Format(#[from] serde_json::Error),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Timing of the client loops.
///
/// Every field is optional in the JSON form; missing ones take the defaults
/// (poll every 5 seconds, tick every second, 10 minute window).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub poll_interval_secs: u64,
    pub tick_interval_secs: u64,
    pub voting_window_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            tick_interval_secs: 1,
            voting_window_secs: 10 * 60,
        }
    }
}

impl Settings {
    pub fn from_json(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval_secs == 0 {
            return Err(SettingsError::Zero("poll_interval_secs"));
        }
        if self.tick_interval_secs == 0 {
            return Err(SettingsError::Zero("tick_interval_secs"));
        }
        if self.voting_window_secs == 0 {
            return Err(SettingsError::Zero("voting_window_secs"));
        }
        Ok(())
    }

    // tokio intervals refuse a zero period, never hand one out
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn voting_window(&self) -> Duration {
        Duration::from_secs(self.voting_window_secs)
    }
}
