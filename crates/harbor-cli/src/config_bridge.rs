//! Bridge from `harbor_config::Config` to the types the plugin and telemetry
//! crates take.

use std::path::PathBuf;

use harbor_config::Config;
use harbor_core::{HarborHome, expand_user_path};
use harbor_plugins::PluginSettings;
use harbor_telemetry::{LogConfig, LogFormat, LogTarget};

/// Convert config to a [`LogConfig`].
///
/// Unknown formats and targets fall back to compact lines on stderr.
pub(crate) fn to_log_config(cfg: &Config, home: &HarborHome) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);
    let target = LogTarget::from_name(&cfg.logging.target, || log_dir(cfg, home))
        .unwrap_or_default();
    let mut log_config = LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_target(target);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Directory for file logs: `logging.directory`, or `<home>/logs`.
fn log_dir(cfg: &Config, home: &HarborHome) -> PathBuf {
    let configured = cfg.logging.directory.trim();
    if configured.is_empty() {
        home.logs_dir()
    } else {
        expand_user_path(configured)
    }
}

/// The extensions directory: `plugins.extensions_dir`, or `<home>/extensions`.
pub(crate) fn extensions_dir(cfg: &Config, home: &HarborHome) -> PathBuf {
    let configured = cfg.plugins.extensions_dir.trim();
    if configured.is_empty() {
        home.extensions_dir()
    } else {
        expand_user_path(configured)
    }
}

/// Configured load paths and enabled flags.
pub(crate) fn to_plugin_settings(cfg: &Config) -> PluginSettings {
    PluginSettings {
        load_paths: cfg
            .plugins
            .load
            .paths
            .iter()
            .map(|p| expand_user_path(p))
            .collect(),
        enabled: cfg.plugins.enabled_flags(),
    }
}
