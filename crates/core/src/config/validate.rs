use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker program is set and stderr cap is positive
/// - Timeout, when set, is not 0
/// - Upload limit is positive
/// - Result template references `{output_id}`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.worker.program.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "worker.program cannot be empty".to_string(),
        ));
    }

    if config.worker.max_stderr_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "worker.max_stderr_bytes must be greater than 0".to_string(),
        ));
    }

    if config.worker.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "worker.timeout_secs cannot be 0; omit it to disable the timeout".to_string(),
        ));
    }

    if config.staging.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "staging.max_upload_bytes must be greater than 0".to_string(),
        ));
    }

    if !config.result.template.contains("{output_id}") {
        return Err(ConfigError::ValidationError(
            "result.template must contain {output_id}".to_string(),
        ));
    }

    Ok(())
}
