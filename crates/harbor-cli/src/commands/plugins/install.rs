use std::sync::Arc;

use anyhow::{Context, bail};
use harbor_config::Config;
use harbor_plugins::{InstallOutcome, Installer, NpmFetcher};

use super::helpers::PluginEnv;
use crate::theme::Theme;

/// Install a plugin from a path, a `.tgz` archive or an npm specifier.
pub(crate) async fn install_plugin(raw: &str, registry: Option<&str>) -> anyhow::Result<()> {
    let env = PluginEnv::load()?;
    env.home.ensure().context("failed to create harbor home")?;

    let mut fetcher = NpmFetcher::new().context("failed to create registry client")?;
    if let Some(url) = registry {
        fetcher = fetcher.with_registry_url(url);
    }
    let installer = Installer::new(env.extensions_dir()).with_fetcher(Arc::new(fetcher));

    let config_path = env.home.config_path();
    match installer.install(raw).await {
        InstallOutcome::Installed {
            plugin_id,
            target_dir,
        } => {
            Config::update(&config_path, |cfg| {
                cfg.set_plugin_enabled(plugin_id.as_str(), true);
            })
            .with_context(|| format!("failed to update {}", config_path.display()))?;

            println!("{}", Theme::success(&format!("Installed plugin: {plugin_id}")));
            println!("{}", Theme::dimmed(&format!("  {}", target_dir.display())));
        },
        InstallOutcome::Linked { plugin_id, path } => {
            let display = path.display().to_string();
            let mut added = false;
            Config::update(&config_path, |cfg| added = cfg.add_load_path(&display))
                .with_context(|| format!("failed to update {}", config_path.display()))?;

            if added {
                println!("{}", Theme::success(&format!("Added plugin path: {display}")));
            } else {
                println!("{}", Theme::dimmed(&format!("Plugin path already configured: {display}")));
            }
            if let Some(id) = plugin_id {
                println!("{}", Theme::dimmed(&format!("  plugin id: {id}")));
            }
        },
        InstallOutcome::Failed { kind, message } => {
            eprintln!("{}", Theme::error(&message));
            bail!("install failed ({kind})");
        },
    }

    println!("{}", Theme::dimmed("Restart the host to load plugins."));
    Ok(())
}
