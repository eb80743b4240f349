use std::fs;
use tracing::{debug, error, info};

use crate::types::server_config::{AppConfig, ConfigError, MIN_SECRET_LEN};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.paths.web_dir.is_empty() {
        return Err(ConfigError::InvalidConfig("web_dir cannot be empty".into()));
    }

    if config.paths.database_url.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "database_url cannot be empty".into(),
        ));
    }

    if config.server.max_connections == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_connections must be greater than 0".into(),
        ));
    }

    if config.server.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "request_timeout_secs must be greater than 0".into(),
        ));
    }

    // A configured secret must be long enough; a missing one is only
    // tolerated outside production, where the development secret kicks in.
    match config.auth.resolved_jwt_secret() {
        None if config.server.production => {
            return Err(ConfigError::InvalidConfig(
                "jwt_secret must be set via the JWT_SECRET_KEY env var or auth.jwt_secret in production"
                    .into(),
            ));
        }
        Some(secret) if secret.len() < MIN_SECRET_LEN => {
            return Err(ConfigError::InvalidConfig(format!(
                "jwt_secret must be at least {} characters long",
                MIN_SECRET_LEN
            )));
        }
        _ => {}
    }

    Ok(())
}
