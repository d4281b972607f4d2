//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let config: RelayConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.upstream.host, "vc-500w.host");
        assert_eq!(config.upstream.port, 9100);
        assert_eq!(config.listener.bind_address, "127.0.0.1");
        assert_eq!(config.listener.backlog, 5);
        assert_eq!(config.limits.max_image_chunk, 20_000_000);
        assert_eq!(config.limits.max_descriptor_size, 50_000);
        assert_eq!(config.timing.poll_interval_ms, 1000);
        assert_eq!(config.timing.drain_timeout(), None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [upstream]
            host = "10.0.0.42"

            [timing]
            read_settle_ms = 0
            drain_timeout_secs = 3

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.host, "10.0.0.42");
        assert_eq!(config.upstream.port, 9100);
        assert!(config.timing.read_settle().is_zero());
        assert_eq!(
            config.timing.drain_timeout(),
            Some(std::time::Duration::from_secs(3))
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = parse_config("[upstream\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = parse_config("[observability]\nlog_format = \"xml\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn semantic_errors_are_reported_together() {
        let err = parse_config("[limits]\nmax_image_chunk = 0\nmax_descriptor_size = 0").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/autocut-relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
