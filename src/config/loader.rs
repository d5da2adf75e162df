//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },

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

/// Load configuration from an optional TOML file, apply environment
/// overrides and the command-line bind address, then validate.
pub fn load_config(path: Option<&Path>, bind: Option<&str>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    resolve(config, |name| std::env::var(name).ok(), bind)
}

/// Apply overrides in precedence order (file, env, CLI) and validate the
/// result.
pub fn resolve<F>(config: AppConfig, lookup: F, bind: Option<&str>) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = apply_env_overrides(config, lookup)?;
    if let Some(bind) = bind {
        config.listener.bind_address = bind.to_string();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `RATE_LIMIT_ENABLED`, `BIND_ADDRESS` and `LOG_FORMAT` overrides.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = parse_bool(&value).ok_or(ConfigError::Env {
            name: "RATE_LIMIT_ENABLED",
            value,
        })?;
    }

    if let Some(value) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = value;
    }

    if let Some(value) = lookup("LOG_FORMAT") {
        config.observability.log_format = match value.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Env {
                    name: "LOG_FORMAT",
                    value,
                })
            }
        };
    }

    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
