use std::path::PathBuf;

use anyhow::Context;
use harbor_config::Config;
use harbor_core::HarborHome;
use harbor_plugins::{LoadSnapshot, StatusRegistry, StatusReport};

use crate::config_bridge;
use crate::theme::Theme;

/// Home directory plus the configuration loaded from it.
pub(crate) struct PluginEnv {
    pub(crate) home: HarborHome,
    pub(crate) config: Config,
}

impl PluginEnv {
    pub(crate) fn load() -> anyhow::Result<Self> {
        let home = HarborHome::resolve().context("failed to resolve harbor home")?;
        let config = Config::load(home.root())
            .with_context(|| format!("failed to load {}", home.config_path().display()))?;
        Ok(Self { home, config })
    }

    pub(crate) fn extensions_dir(&self) -> PathBuf {
        config_bridge::extensions_dir(&self.config, &self.home)
    }

    /// Build a status report, joining against the host's last load snapshot.
    pub(crate) fn report(&self) -> StatusReport {
        let snapshot_path = self.home.load_snapshot_path();
        let snapshot = LoadSnapshot::load(&snapshot_path).unwrap_or_else(|e| {
            eprintln!("{}", Theme::warning(&format!("ignoring load snapshot: {e}")));
            LoadSnapshot::default()
        });

        StatusRegistry::new(
            self.extensions_dir(),
            config_bridge::to_plugin_settings(&self.config),
        )
        .with_outcomes(&snapshot)
        .report()
    }
}
