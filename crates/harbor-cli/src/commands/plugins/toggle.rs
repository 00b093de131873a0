use anyhow::Context;
use harbor_config::Config;
use harbor_core::HarborHome;
use tracing::info;

use crate::theme::Theme;

/// Flip `plugins.entries.<id>.enabled` in the user config.
pub(crate) fn set_plugin_enabled(id: &str, enabled: bool) -> anyhow::Result<()> {
    let home = HarborHome::resolve().context("failed to resolve harbor home")?;
    home.ensure().context("failed to create harbor home")?;

    let path = home.config_path();
    Config::update(&path, |cfg| cfg.set_plugin_enabled(id, enabled))
        .with_context(|| format!("failed to update {}", path.display()))?;
    info!(plugin_id = %id, enabled, "updated plugin entry");

    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("{}", Theme::success(&format!("{verb} plugin \"{id}\".")));
    println!("{}", Theme::dimmed("Restart the host to apply."));
    Ok(())
}
