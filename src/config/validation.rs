use crate::config::types::{BypassConfig, CheckpointConfig, Config, NetworkConfig, SolverConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Highest accepted `checkpoint.max-stage`
pub const MAX_STAGE_LIMIT: u32 = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_checkpoint_config(&config.checkpoint)?;
    validate_bypass_config(&config.bypass)?;
    validate_network_config(&config.network)?;
    validate_solver_config(&config.solver)?;
    Ok(())
}

/// Validates checkpoint service configuration
fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    validate_host("checkpoint.host", &config.host)?;
    validate_site_key("checkpoint.site-key", &config.site_key)?;

    if config.max_stage > MAX_STAGE_LIMIT {
        return Err(ConfigError::Validation(format!(
            "checkpoint.max-stage must be <= {}, got {}",
            MAX_STAGE_LIMIT, config.max_stage
        )));
    }

    if !config.entry_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "checkpoint.entry-path must start with '/', got '{}'",
            config.entry_path
        )));
    }

    if !config.result_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "checkpoint.result-path must start with '/', got '{}'",
            config.result_path
        )));
    }

    if config.proof_field.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint.proof-field cannot be empty".to_string(),
        ));
    }

    validate_selector(&config.progress_selector)?;
    validate_selector(&config.key_selector)?;

    Ok(())
}

/// Validates bypass service configuration
fn validate_bypass_config(config: &BypassConfig) -> Result<(), ConfigError> {
    validate_host("bypass.host", &config.host)?;
    validate_host("bypass.api-host", &config.api_host)?;
    validate_site_key("bypass.site-key", &config.site_key)?;

    if config.max_poll_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "bypass.max-poll-attempts must be >= 1, got {}",
            config.max_poll_attempts
        )));
    }

    if config.max_poll_duration_ms == Some(0) {
        return Err(ConfigError::Validation(
            "bypass.max-poll-duration-ms must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates network configuration
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    if config.fetch_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "network.fetch-timeout-ms must be >= 100ms, got {}ms",
            config.fetch_timeout_ms
        )));
    }

    if config.retry.attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "network.retry.attempts must be >= 1, got {}",
            config.retry.attempts
        )));
    }

    if !config.retry.factor.is_finite() || config.retry.factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "network.retry.factor must be a finite number >= 1, got {}",
            config.retry.factor
        )));
    }

    Ok(())
}

/// Validates solver configuration
fn validate_solver_config(config: &SolverConfig) -> Result<(), ConfigError> {
    validate_host("solver.api-host", &config.api_host)?;

    if config.credentials_path.is_empty() {
        return Err(ConfigError::Validation(
            "solver.credentials-path cannot be empty".to_string(),
        ));
    }

    if config.max_poll_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "solver.max-poll-attempts must be >= 1, got {}",
            config.max_poll_attempts
        )));
    }

    Ok(())
}

/// Validates that a host is an absolute http(s) URL
fn validate_host(field: &str, host: &str) -> Result<(), ConfigError> {
    let url = Url::parse(host)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, host, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} must use http or https, got '{}'",
            field, host
        )));
    }

    Ok(())
}

fn validate_site_key(field: &str, key: &str) -> Result<(), ConfigError> {
    if key.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn validate_selector(css: &str) -> Result<(), ConfigError> {
    Selector::parse(css)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_host() {
        assert!(validate_host("h", "https://example.com").is_ok());
        assert!(validate_host("h", "http://127.0.0.1:8080").is_ok());

        assert!(validate_host("h", "").is_err());
        assert!(validate_host("h", "example.com").is_err());
        assert!(validate_host("h", "ftp://example.com").is_err());
    }

    #[test]
    fn test_rejects_empty_site_key() {
        let mut config = Config::default();
        config.bypass.site_key = "   ".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_shrinking_backoff() {
        let mut config = Config::default();
        config.network.retry.factor = 0.5;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_zero_retry_attempts() {
        let mut config = Config::default();
        config.network.retry.attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_selector() {
        let mut config = Config::default();
        config.checkpoint.key_selector = "##".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_rejects_relative_entry_path() {
        let mut config = Config::default();
        config.checkpoint.entry_path = "lootlabs".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_unbounded_max_stage() {
        let mut config = Config::default();
        config.checkpoint.max_stage = u32::MAX;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.checkpoint.max_stage = MAX_STAGE_LIMIT;
        assert!(validate(&config).is_ok());
    }
}
