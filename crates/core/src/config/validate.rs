use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section is consistent (api_key present when method = "api_key")
/// - Server port is not 0
/// - Dispatcher pool size is at least 1
/// - Retry backoff multiplier is at least 1.0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if matches!(config.auth.method, AuthMethod::ApiKey) && config.auth.api_key.is_none() {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.dispatcher.max_concurrent_tasks == 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.max_concurrent_tasks must be at least 1".to_string(),
        ));
    }

    if config.pipeline.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "pipeline.retry.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }

    Ok(())
}
