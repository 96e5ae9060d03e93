use super::types::{Config, ConfigError};

/// Validate a loaded configuration before wiring components.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.scheduler.validate().map_err(ConfigError::Invalid)?;
    config.pipeline.validate().map_err(ConfigError::Invalid)?;
    config.cloner.validate().map_err(ConfigError::Invalid)?;
    config.matcher.validate().map_err(ConfigError::Invalid)?;

    if config.storage.data_root.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "storage.data_root must not be empty".to_string(),
        ));
    }

    Ok(())
}
