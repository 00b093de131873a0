//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_plugins(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_plugins(config: &Config) -> ConfigResult<()> {
    let p = &config.plugins;

    if let Some(idx) = p.load.paths.iter().position(|path| path.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("plugins.load.paths[{idx}]"),
            message: "load path must not be empty".to_owned(),
        });
    }

    if p.entries.keys().any(|id| id.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "plugins.entries".to_owned(),
            message: "plugin id must not be empty".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if l.level.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: "log level must not be empty".to_owned(),
        });
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        });
    }

    if !matches!(l.target.as_str(), "stderr" | "stdout" | "file") {
        return Err(ConfigError::ValidationError {
            field: "logging.target".to_owned(),
            message: format!(
                "unsupported target '{}'; expected one of: stderr, stdout, file",
                l.target
            ),
        });
    }

    Ok(())
}
