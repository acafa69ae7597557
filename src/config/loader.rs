//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [content]
            root = "/srv/site"
            git = true

            [reload]
            secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(config.content.root, "/srv/site");
        assert!(config.content.git);
        assert_eq!(config.reload.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.reload.capacity, 2);
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n").unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: timeouts.request_secs must be greater than zero");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitetree.toml");
        std::fs::write(&path, "[listener]\nbind_address = \"0.0.0.0:9000\"\n").unwrap();
        assert_eq!(load_config(&path).unwrap().listener.bind_address, "0.0.0.0:9000");
        assert!(matches!(load_config(&dir.path().join("missing.toml")), Err(ConfigError::Io(_))));
    }
}
