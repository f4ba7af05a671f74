use super::{Config, ConfigError};
use crate::buffer::MAX_BATCH_SIZE;
use url::Url;

/// Retention periods the backend accepts, in days.
pub const RETENTION_DAYS_ALLOWED: [u32; 22] = [
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid endpoint URL '{}': {}", self.endpoint, e))
        })?;

        for (field, value) in [
            ("account_alias", &self.account_alias),
            ("stage", &self.stage),
            ("application", &self.application),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!("{field} is required")));
            }
        }

        if !RETENTION_DAYS_ALLOWED.contains(&self.retention_days) {
            return Err(ConfigError::InvalidConfig(format!(
                "Retention of {} days is not supported. Valid values: {:?}",
                self.retention_days, RETENTION_DAYS_ALLOWED
            )));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidConfig(format!(
                "Batch size can not be greater than {MAX_BATCH_SIZE}"
            )));
        }

        if let Some(stream_name) = &self.stream_name
            && stream_name.is_empty()
        {
            return Err(ConfigError::InvalidConfig(
                "Stream name override must not be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.connection_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
