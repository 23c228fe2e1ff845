use crate::config::types::{Config, OrchestratorConfig, ProbeConfig, ServerConfig, WorkConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_probe_config(&config.probe)?;
    validate_orchestrator_config(&config.orchestrator)?;
    validate_work_config(&config.work)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    if let Some(key) = &config.api_key {
        if key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "api-key must not be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_probe_config(config: &ProbeConfig) -> Result<(), ConfigError> {
    validate_http_url("probe target-url", &config.target_url)?;

    if config.timeout_secs < 1 || config.timeout_secs > 60 {
        return Err(ConfigError::Validation(format!(
            "probe timeout-secs must be between 1 and 60, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "probe user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    if config.slot_backoff_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "slot-backoff-ms must be >= 10ms, got {}ms",
            config.slot_backoff_ms
        )));
    }

    if config.recovery_delay_secs < 1 {
        return Err(ConfigError::Validation(
            "recovery-delay-secs must be >= 1".to_string(),
        ));
    }

    if config.work_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "work-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.shutdown_grace_secs < 1 {
        return Err(ConfigError::Validation(
            "shutdown-grace-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_work_config(config: &WorkConfig) -> Result<(), ConfigError> {
    // Placeholders are not valid URL characters, so check a rendered sample
    let sample = config
        .url_template
        .replace("{subject}", "sample")
        .replace("{limit}", "1");
    validate_http_url("work url-template", &sample)?;

    if !config.items_pointer.is_empty() && !config.items_pointer.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "items-pointer must be empty or start with '/', got '{}'",
            config.items_pointer
        )));
    }

    Ok(())
}

/// Parses a URL and requires an http(s) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
