//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and path shapes.
//! Every violation is reported, not just the first.

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("{field} must start with '/': {value}")]
    RelativePath { field: &'static str, value: String },

    #[error("listener.bind_address is not a socket address: {0}")]
    BindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("auth.{0} is below the Argon2 minimum")]
    WeakPasswordCost(&'static str),

    #[error("dataset.default_file must be a bare file name: {0}")]
    DatasetFile(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.general_limit == 0 {
        errors.push(ValidationError::ZeroLimit("general_limit"));
    }
    if config.rate_limit.auth_limit == 0 {
        errors.push(ValidationError::ZeroLimit("auth_limit"));
    }
    if !config.rate_limit.login_path.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            field: "rate_limit.login_path",
            value: config.rate_limit.login_path.clone(),
        });
    }
    for prefix in &config.cache.cacheable_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                field: "cache.cacheable_prefixes",
                value: prefix.clone(),
            });
        }
    }
    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.auth.password_memory_kib < 8 {
        errors.push(ValidationError::WeakPasswordCost("password_memory_kib"));
    }
    if config.auth.password_time_cost == 0 {
        errors.push(ValidationError::WeakPasswordCost("password_time_cost"));
    }

    if !is_bare_file_name(&config.dataset.default_file) {
        errors.push(ValidationError::DatasetFile(
            config.dataset.default_file.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A single path component that cannot climb out of its directory.
pub fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}
