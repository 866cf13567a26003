use crate::config::types::{Config, CrawlerConfig, OutputConfig, StrategyConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for `max-urls`
const MAX_URLS_LIMIT: u32 = 10_000;

/// Upper bound for `throttle-ms`
const MAX_THROTTLE_MS: u64 = 60_000;

/// Upper bound for `max-retries`
const MAX_RETRIES_LIMIT: u32 = 5;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_strategy_config(&config.strategy)?;
    Ok(())
}

/// Validates crawler configuration
pub(crate) fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_urls < 1 || config.max_urls > MAX_URLS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_urls must be between 1 and {}, got {}",
            MAX_URLS_LIMIT, config.max_urls
        )));
    }

    if config.throttle_ms > MAX_THROTTLE_MS {
        return Err(ConfigError::Validation(format!(
            "throttle_ms must be <= {}ms, got {}ms",
            MAX_THROTTLE_MS, config.throttle_ms
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.connect_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_ms must be >= 100ms, got {}ms",
            config.connect_timeout_ms
        )));
    }

    if config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.work_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "work_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates strategy configuration
fn validate_strategy_config(config: &StrategyConfig) -> Result<(), ConfigError> {
    if config.wget_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "wget_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_max_urls_bounds() {
        let mut crawler = CrawlerConfig::default();
        crawler.max_urls = 0;
        assert!(validate_crawler_config(&crawler).is_err());

        crawler.max_urls = MAX_URLS_LIMIT + 1;
        assert!(validate_crawler_config(&crawler).is_err());

        crawler.max_urls = 1;
        assert!(validate_crawler_config(&crawler).is_ok());
    }

    #[test]
    fn test_validate_timeouts() {
        let mut crawler = CrawlerConfig::default();
        crawler.request_timeout_ms = 50;
        assert!(validate_crawler_config(&crawler).is_err());

        let mut crawler = CrawlerConfig::default();
        crawler.connect_timeout_ms = 0;
        assert!(validate_crawler_config(&crawler).is_err());
    }

    #[test]
    fn test_validate_throttle_and_retries() {
        let mut crawler = CrawlerConfig::default();
        crawler.throttle_ms = MAX_THROTTLE_MS + 1;
        assert!(validate_crawler_config(&crawler).is_err());

        let mut crawler = CrawlerConfig::default();
        crawler.throttle_ms = 0;
        assert!(validate_crawler_config(&crawler).is_ok());

        crawler.max_retries = MAX_RETRIES_LIMIT + 1;
        assert!(validate_crawler_config(&crawler).is_err());
    }

    #[test]
    fn test_validate_crawler_name() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "bad name!".to_string();
        assert!(validate(&config).is_err());

        config.user_agent.crawler_name = String::new();
        assert!(validate(&config).is_err());

        config.user_agent.crawler_name = "Sumi-Mirror2".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_contact_url() {
        let mut config = Config::default();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_validate_empty_paths() {
        let mut config = Config::default();
        config.output.work_dir = "  ".to_string();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.strategy.wget_path = String::new();
        assert!(validate(&config).is_err());
    }
}
